//! Pre-trade disclaimers returned by a precheck.

use serde::{Deserialize, Serialize};

/// Context token and disclaimer tokens attached to a precheck response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclaimerBundle {
    /// Opaque context echoed back when accepting.
    pub context: String,
    /// Disclaimer tokens requiring resolution.
    pub tokens: Vec<String>,
}

/// Response value that accepts a disclaimer.
pub const ACCEPTED_RESPONSE: &str = "Accepted";

/// Details of one disclaimer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclaimerRecord {
    /// Disclaimer token.
    pub token: String,
    /// Blocking disclaimers can only be resolved out of band.
    pub is_blocking: bool,
    /// Title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Response values the venue offers.
    pub response_options: Vec<String>,
    /// Conditions requiring user input, as raw descriptions.
    pub conditions: Vec<String>,
}

impl DisclaimerRecord {
    /// Placeholder for a token whose details could not be fetched.
    /// Always blocking.
    #[must_use]
    pub fn unavailable(token: impl Into<String>, error: &str) -> Self {
        Self {
            token: token.into(),
            is_blocking: true,
            title: "Disclaimer unavailable".to_string(),
            body: format!("details could not be retrieved: {error}"),
            response_options: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Whether the pipeline may accept this disclaimer without a human.
    #[must_use]
    pub fn can_auto_accept(&self) -> bool {
        !self.is_blocking
            && self.conditions.is_empty()
            && self
                .response_options
                .iter()
                .any(|option| option == ACCEPTED_RESPONSE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal() -> DisclaimerRecord {
        DisclaimerRecord {
            token: "t1".to_string(),
            is_blocking: false,
            title: "KID".to_string(),
            body: String::new(),
            response_options: vec!["Accepted".to_string(), "Declined".to_string()],
            conditions: Vec::new(),
        }
    }

    #[test]
    fn test_plain_normal_disclaimer_is_auto_acceptable() {
        assert!(normal().can_auto_accept());
    }

    #[test]
    fn test_conditions_forbid_auto_accept() {
        let mut record = normal();
        record.conditions.push("confirm experience".to_string());
        assert!(!record.can_auto_accept());
    }

    #[test]
    fn test_missing_accepted_option_forbids_auto_accept() {
        let mut record = normal();
        record.response_options = vec!["Declined".to_string()];
        assert!(!record.can_auto_accept());
    }

    #[test]
    fn test_unavailable_is_blocking() {
        let record = DisclaimerRecord::unavailable("t9", "timeout");
        assert!(record.is_blocking);
        assert!(!record.can_auto_accept());
    }
}
