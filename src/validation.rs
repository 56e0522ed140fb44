use crate::currency::Currency;
use crate::error::ApiError;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use validator::{Validate, ValidationError, ValidationErrors};

pub const MAX_COIN_ID_LEN: u64 = 50;

static COIN_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("coin id pattern is valid"));

/// Raw query string of the market endpoint.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct MarketQuery {
    #[validate(custom(function = "validate_currency"))]
    pub currency: Option<String>,

    #[serde(rename = "coinId")]
    #[validate(
        length(min = 1, max = 50, message = "Invalid coinId"),
        regex(path = *COIN_ID_PATTERN, message = "Invalid coinId")
    )]
    pub coin_id: Option<String>,

    #[serde(rename = "topMarketCaps")]
    pub top_market_caps: Option<String>,
}

/// A validated market query, resolved to the one operation it asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketRequest {
    Leaderboard { currency: Currency },
    Chart { currency: Currency, coin_id: String },
    CoinList { currency: Currency },
}

impl MarketRequest {
    pub fn currency(&self) -> Currency {
        match self {
            MarketRequest::Leaderboard { currency }
            | MarketRequest::Chart { currency, .. }
            | MarketRequest::CoinList { currency } => *currency,
        }
    }
}

fn validate_currency(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Currency>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("currency").with_message("Invalid currency".into()))
}

fn is_truthy(flag: &str) -> bool {
    let flag = flag.trim();
    !(flag.is_empty() || flag == "0" || flag.eq_ignore_ascii_case("false"))
}

fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid query parameters".to_string())
}

impl MarketQuery {
    /// Check the allow-lists and pick the operation: leaderboard beats coin
    /// id, coin id beats the default coin list.
    pub fn into_request(self) -> Result<MarketRequest, ApiError> {
        self.validate()
            .map_err(|e| ApiError::InvalidRequest(first_message(&e)))?;

        let currency = match self.currency.as_deref() {
            Some(code) => code
                .parse()
                .map_err(|_| ApiError::InvalidRequest("Invalid currency".to_string()))?,
            None => Currency::default(),
        };

        if self.top_market_caps.as_deref().is_some_and(is_truthy) {
            return Ok(MarketRequest::Leaderboard { currency });
        }

        match self.coin_id {
            Some(coin_id) => Ok(MarketRequest::Chart { currency, coin_id }),
            None => Ok(MarketRequest::CoinList { currency }),
        }
    }
}
