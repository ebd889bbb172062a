//! Coded API errors.
//!
//! Each variant carries a fixed numeric code and message; `Display` renders
//! `"{code} - {message}"`. The error is its own retry kind, so a policy can
//! retry `Request` failures while letting `Mission` conflicts through.

use thiserror::Error;

use super::kind::Classify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ApiError {
    #[error("205 - No Locations was found or data about location is missing")]
    Locations,

    #[error("505 - Was not able to get Data from the API")]
    Request,

    #[error("406 - Mission Was already created. Choose a different name or call the mission")]
    Mission,

    #[error("515 - This location's Elevation info is either invalid or set to None")]
    Elevation,
}

impl ApiError {
    pub const ALL: [ApiError; 4] = [
        ApiError::Locations,
        ApiError::Request,
        ApiError::Mission,
        ApiError::Elevation,
    ];

    pub fn code(&self) -> u16 {
        match self {
            ApiError::Locations => 205,
            ApiError::Request => 505,
            ApiError::Mission => 406,
            ApiError::Elevation => 515,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ApiError::Locations => "No Locations was found or data about location is missing",
            ApiError::Request => "Was not able to get Data from the API",
            ApiError::Mission => {
                "Mission Was already created. Choose a different name or call the mission"
            }
            ApiError::Elevation => {
                "This location's Elevation info is either invalid or set to None"
            }
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.code() == code)
    }
}

impl Classify for ApiError {
    type Kind = ApiError;

    fn kind(&self) -> ApiError {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::locations(ApiError::Locations, 205)]
    #[case::request(ApiError::Request, 505)]
    #[case::mission(ApiError::Mission, 406)]
    #[case::elevation(ApiError::Elevation, 515)]
    fn code_lookup(#[case] error: ApiError, #[case] code: u16) {
        assert_eq!(error.code(), code);
        assert_eq!(ApiError::from_code(code), Some(error));
    }

    #[test]
    fn display_is_code_dash_message() {
        for error in ApiError::ALL {
            assert_eq!(error.to_string(), format!("{} - {}", error.code(), error.message()));
        }
    }

    #[test]
    fn unknown_code() {
        assert_eq!(ApiError::from_code(200), None);
    }
}
