/// Error code registry
///
/// Error codes are organized by category:
/// - 1000-1999: Lookup errors
/// - 2000-2999: State transition errors
/// - 3000-3999: Storage errors
/// - 4000-4999: Pricing errors
/// - 5000-5999: Routing errors
/// - 7000-7999: Validation errors
/// - 8000-8999: Configuration errors
pub struct ErrorCode;

impl ErrorCode {
    // Lookup errors (1000-1999)
    pub const NOT_FOUND: u16 = 1001;

    // State transition errors (2000-2999)
    pub const INVALID_TRANSITION: u16 = 2001;
    pub const WRITE_CONFLICT: u16 = 2002;
    pub const FORBIDDEN: u16 = 2003;

    // Storage errors (3000-3999)
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_ALREADY_EXISTS: u16 = 3005;

    // Pricing errors (4000-4999)
    pub const NO_APPLICABLE_RATE: u16 = 4001;
    pub const ARITHMETIC: u16 = 4002;

    // Routing errors (5000-5999)
    pub const DISTANCE_UNAVAILABLE: u16 = 5001;

    // Validation errors (7000-7999)
    pub const VALIDATION_FAILED: u16 = 7001;

    // Configuration errors (8000-8999)
    pub const CONFIG_INVALID: u16 = 8001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::NOT_FOUND => "The requested record does not exist",
        ErrorCode::INVALID_TRANSITION => "The record's current status does not allow this action",
        ErrorCode::WRITE_CONFLICT => "The record is not in a state that permits this write",
        ErrorCode::FORBIDDEN => "The record cannot be changed or removed",
        ErrorCode::STORAGE_NOT_FOUND => "Record missing from the store",
        ErrorCode::STORAGE_ALREADY_EXISTS => "A record with the same unique key exists",
        ErrorCode::NO_APPLICABLE_RATE => "No tariff rate covers the weight, date and distance",
        ErrorCode::ARITHMETIC => "Amount out of range",
        ErrorCode::DISTANCE_UNAVAILABLE => "Distance between the addresses could not be determined",
        ErrorCode::VALIDATION_FAILED => "One or more fields failed validation",
        ErrorCode::CONFIG_INVALID => "Invalid configuration",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_has_description() {
        for code in [
            ErrorCode::NOT_FOUND,
            ErrorCode::INVALID_TRANSITION,
            ErrorCode::WRITE_CONFLICT,
            ErrorCode::FORBIDDEN,
            ErrorCode::STORAGE_NOT_FOUND,
            ErrorCode::STORAGE_ALREADY_EXISTS,
            ErrorCode::NO_APPLICABLE_RATE,
            ErrorCode::DISTANCE_UNAVAILABLE,
            ErrorCode::VALIDATION_FAILED,
            ErrorCode::CONFIG_INVALID,
        ] {
            assert_ne!(describe_error_code(code), "Unknown error");
        }
        assert_eq!(describe_error_code(9999), "Unknown error");
    }
}
