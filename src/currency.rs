use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Quote currencies the dashboard supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Currency {
    Bgn,
    Chf,
    #[default]
    Usd,
    Eur,
    Sar,
    Aed,
    Gbp,
}

impl Currency {
    pub const ALL: [Currency; 7] = [
        Currency::Bgn,
        Currency::Chf,
        Currency::Usd,
        Currency::Eur,
        Currency::Sar,
        Currency::Aed,
        Currency::Gbp,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Bgn => "bgn",
            Currency::Chf => "chf",
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Sar => "sar",
            Currency::Aed => "aed",
            Currency::Gbp => "gbp",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Bgn => "лв",
            Currency::Chf => "Fr.",
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Sar => "ر.س",
            Currency::Aed => "د.إ",
            Currency::Gbp => "£",
        }
    }

    /// Dropdown label, e.g. `"$ USD"`.
    pub fn label(&self) -> String {
        format!("{} {}", self.symbol(), self.code().to_uppercase())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedCurrency(pub String);

impl fmt::Display for UnsupportedCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported currency '{}'", self.0)
    }
}

impl std::error::Error for UnsupportedCurrency {}

impl FromStr for Currency {
    type Err = UnsupportedCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| UnsupportedCurrency(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CurrencyOption {
    pub code: &'static str,
    pub label: String,
}

pub fn currency_options() -> Vec<CurrencyOption> {
    Currency::ALL
        .iter()
        .map(|c| CurrencyOption {
            code: c.code(),
            label: c.label(),
        })
        .collect()
}
