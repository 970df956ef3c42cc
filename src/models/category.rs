use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of listing categories
///
/// On the wire `Rideshare` is `ridesharing` and `Marketplace` is `buy-sell`;
/// the display names `rideshare` and `marketplace` are accepted on input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[serde(rename = "ridesharing", alias = "rideshare")]
    Rideshare,
    PickDrop,
    Jobs,
    #[serde(rename = "buy-sell", alias = "marketplace")]
    Marketplace,
    Accommodation,
    CurrencyExchange,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Rideshare,
        Category::PickDrop,
        Category::Jobs,
        Category::Marketplace,
        Category::Accommodation,
        Category::CurrencyExchange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Rideshare => "rideshare",
            Category::PickDrop => "pick-drop",
            Category::Jobs => "jobs",
            Category::Marketplace => "marketplace",
            Category::Accommodation => "accommodation",
            Category::CurrencyExchange => "currency-exchange",
        }
    }

    /// Name the backend stores and filters by
    pub fn wire_name(&self) -> &'static str {
        match self {
            Category::Rideshare => "ridesharing",
            Category::Marketplace => "buy-sell",
            other => other.as_str(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Rideshare => "Rideshare",
            Category::PickDrop => "Pick & Drop",
            Category::Jobs => "Jobs",
            Category::Marketplace => "Marketplace",
            Category::Accommodation => "Accommodation",
            Category::CurrencyExchange => "Currency Exchange",
        }
    }

    /// Path prefix of the detail page; ride listings have none
    pub fn route_prefix(&self) -> Option<&'static str> {
        match self {
            Category::Jobs => Some("jobs"),
            Category::Accommodation => Some("accommodation"),
            Category::Marketplace => Some("marketplace"),
            Category::CurrencyExchange => Some("currency"),
            Category::Rideshare | Category::PickDrop => None,
        }
    }

    pub fn is_clickable(&self) -> bool {
        self.route_prefix().is_some()
    }

    /// Ride listings are answered through a contact dialog instead of a page
    pub fn shows_contact_button(&self) -> bool {
        matches!(self, Category::Rideshare | Category::PickDrop)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rideshare" | "ridesharing" => Ok(Category::Rideshare),
            "pick-drop" => Ok(Category::PickDrop),
            "jobs" => Ok(Category::Jobs),
            "marketplace" | "buy-sell" => Ok(Category::Marketplace),
            "accommodation" => Ok(Category::Accommodation),
            "currency-exchange" => Ok(Category::CurrencyExchange),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// A user-facing category bucket
///
/// Every bucket matches exactly one category, except `PickDrop`, which is
/// the merged "Pick & Drop" bucket covering both `PickDrop` and `Rideshare`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryFilter {
    Rideshare,
    PickDrop,
    Jobs,
    Marketplace,
    Accommodation,
    CurrencyExchange,
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::PickDrop => {
                matches!(category, Category::PickDrop | Category::Rideshare)
            }
            CategoryFilter::Rideshare => category == Category::Rideshare,
            CategoryFilter::Jobs => category == Category::Jobs,
            CategoryFilter::Marketplace => category == Category::Marketplace,
            CategoryFilter::Accommodation => category == Category::Accommodation,
            CategoryFilter::CurrencyExchange => category == Category::CurrencyExchange,
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        match category {
            Category::Rideshare => CategoryFilter::Rideshare,
            Category::PickDrop => CategoryFilter::PickDrop,
            Category::Jobs => CategoryFilter::Jobs,
            Category::Marketplace => CategoryFilter::Marketplace,
            Category::Accommodation => CategoryFilter::Accommodation,
            Category::CurrencyExchange => CategoryFilter::CurrencyExchange,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Category>().map(CategoryFilter::from)
    }
}
