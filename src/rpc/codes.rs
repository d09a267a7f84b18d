//! JSON-RPC error taxonomy
//!
//! Standard JSON-RPC 2.0 codes plus the two extension codes used for version
//! mismatches and reserved method names.

pub const JSON_RPC_VERSION: &str = "2.0";
pub const RESERVED_PREFIX: &str = "rpc.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    MismatchedVersion,
    ReservedPrefix,
    Exception,
}

impl ErrorCode {
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::MismatchedVersion => -32000,
            Self::ReservedPrefix => -32001,
            Self::Exception => -32099,
        }
    }

    /// Default wire message. `Exception` carries the fault text instead, so its
    /// default is only a fallback.
    pub const fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error.",
            Self::InvalidRequest => "Invalid Request.",
            Self::MethodNotFound => "Method not found.",
            Self::InvalidParams => "Too few parameters passed.",
            Self::MismatchedVersion => "Client/Server JSON-RPC version mismatch; Expected '2.0'",
            Self::ReservedPrefix => "Illegal method name; Method cannot start with 'rpc.'",
            Self::Exception => "Method raised an exception.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;

    #[test]
    fn standard_codes_match_json_rpc() {
        assert_eq!(ErrorCode::ParseError.code(), -32700);
        assert_eq!(ErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::InvalidParams.code(), -32602);
    }

    #[test]
    fn extension_codes_stay_in_server_range() {
        for code in [
            ErrorCode::MismatchedVersion,
            ErrorCode::ReservedPrefix,
            ErrorCode::Exception,
        ] {
            assert!((-32099..=-32000).contains(&code.code()));
        }
    }
}
