//! HTTP status codes.
//!
//! [`Status`] groups codes by class. Each class is a closed enum of the codes
//! the server knows by name plus an `Other(code)` variant for the rest of the
//! class range. Codes outside `100..=599` become [`Status::Unknown`].

use std::fmt;

/// Reason phrase for codes without a well-known name.
pub const UNNAMED_REASON: &str = "??";

macro_rules! status_class {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident = $code:literal => $reason:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
            /// A code of this class without a well-known name.
            Other(u16),
        }

        impl $name {
            /// Maps a code of this class to its variant.
            pub fn from_code(code: u16) -> Self {
                match code {
                    $( $code => $name::$variant, )+
                    other => $name::Other(other),
                }
            }

            pub fn code(&self) -> u16 {
                match self {
                    $( $name::$variant => $code, )+
                    $name::Other(code) => *code,
                }
            }

            pub fn reason_phrase(&self) -> &'static str {
                match self {
                    $( $name::$variant => $reason, )+
                    $name::Other(_) => UNNAMED_REASON,
                }
            }
        }
    };
}

status_class! {
    /// 1xx codes.
    Informational {
        Continue = 100 => "Continue",
        SwitchingProtocols = 101 => "Switching Protocols",
        Processing = 102 => "Processing",
    }
}

status_class! {
    /// 2xx codes.
    Success {
        Ok = 200 => "OK",
        Created = 201 => "Created",
        Accepted = 202 => "Accepted",
        NonAuthoritativeInformation = 203 => "Non-Authoritative Information",
        NoContent = 204 => "No Content",
        ResetContent = 205 => "Reset Content",
        PartialContent = 206 => "Partial Content",
        MultiStatus = 207 => "Multi-Status",
        AlreadyReported = 208 => "Already Reported",
    }
}

status_class! {
    /// 3xx codes.
    Redirection {
        MultipleChoices = 300 => "Multiple Choices",
        MovedPermanently = 301 => "Moved Permanently",
        Found = 302 => "Found",
        SeeOther = 303 => "See Other",
        NotModified = 304 => "Not Modified",
        UseProxy = 305 => "Use Proxy",
        SwitchProxy = 306 => "Switch Proxy",
        TemporaryRedirect = 307 => "Temporary Redirect",
        PermanentRedirect = 308 => "Permanent Redirect",
    }
}

status_class! {
    /// 4xx codes.
    ClientError {
        BadRequest = 400 => "Bad Request",
        Unauthorized = 401 => "Unauthorized",
        PaymentRequired = 402 => "Payment Required",
        Forbidden = 403 => "Forbidden",
        NotFound = 404 => "Not Found",
        MethodNotAllowed = 405 => "Method Not Allowed",
        NotAcceptable = 406 => "Not Acceptable",
        ProxyAuthenticationRequired = 407 => "Proxy Authentication Required",
        RequestTimeout = 408 => "Request Timeout",
        Conflict = 409 => "Conflict",
        Gone = 410 => "Gone",
        LengthRequired = 411 => "Length Required",
        PreconditionFailed = 412 => "Precondition Failed",
        PayloadTooLarge = 413 => "Payload Too Large",
        UriTooLong = 414 => "URI Too Long",
        UnsupportedMediaType = 415 => "Unsupported Media Type",
        RangeNotSatisfiable = 416 => "Range Not Satisfiable",
        ExpectationFailed = 417 => "Expectation Failed",
        ImATeapot = 418 => "I'm a teapot",
        MisdirectedRequest = 421 => "Misdirected Request",
        UnprocessableEntity = 422 => "Unprocessable Entity",
        Locked = 423 => "Locked",
        FailedDependency = 424 => "Failed Dependency",
        TooEarly = 425 => "Too Early",
        UpgradeRequired = 426 => "Upgrade Required",
        PreconditionRequired = 428 => "Precondition Required",
        TooManyRequests = 429 => "Too Many Requests",
        RequestHeaderFieldsTooLarge = 431 => "Request Header Fields Too Large",
        UnavailableForLegalReasons = 451 => "Unavailable For Legal Reasons",
    }
}

status_class! {
    /// 5xx codes.
    ServerError {
        InternalServerError = 500 => "Internal Server Error",
        NotImplemented = 501 => "Not Implemented",
        BadGateway = 502 => "Bad Gateway",
        ServiceUnavailable = 503 => "Service Unavailable",
        GatewayTimeout = 504 => "Gateway Timeout",
        HttpVersionNotSupported = 505 => "HTTP Version Not Supported",
        VariantAlsoNegotiates = 506 => "Variant Also Negotiates",
        InsufficientStorage = 507 => "Insufficient Storage",
        LoopDetected = 508 => "Loop Detected",
        NotExtended = 510 => "Not Extended",
        NetworkAuthenticationRequired = 511 => "Network Authentication Required",
    }
}

/// The class of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
    Unknown,
}

/// An HTTP status, tagged by class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Informational(Informational),
    Success(Success),
    Redirection(Redirection),
    ClientError(ClientError),
    ServerError(ServerError),
    /// A code outside `100..=599`.
    Unknown(u16),
}

impl Status {
    pub const OK: Status = Status::Success(Success::Ok);
    pub const NO_CONTENT: Status = Status::Success(Success::NoContent);
    pub const BAD_REQUEST: Status = Status::ClientError(ClientError::BadRequest);
    pub const FORBIDDEN: Status = Status::ClientError(ClientError::Forbidden);
    pub const NOT_FOUND: Status = Status::ClientError(ClientError::NotFound);
    pub const INTERNAL_SERVER_ERROR: Status =
        Status::ServerError(ServerError::InternalServerError);
    pub const SERVICE_UNAVAILABLE: Status = Status::ServerError(ServerError::ServiceUnavailable);

    /// Looks up a numeric code.
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::status::{ClientError, Status};
    /// assert_eq!(Status::from_code(404), Status::ClientError(ClientError::NotFound));
    /// assert_eq!(Status::from_code(499).reason_phrase(), "??");
    /// assert_eq!(Status::from_code(42), Status::Unknown(42));
    /// ```
    pub fn from_code(code: u16) -> Self {
        match code {
            100..=199 => Status::Informational(Informational::from_code(code)),
            200..=299 => Status::Success(Success::from_code(code)),
            300..=399 => Status::Redirection(Redirection::from_code(code)),
            400..=499 => Status::ClientError(ClientError::from_code(code)),
            500..=599 => Status::ServerError(ServerError::from_code(code)),
            _ => Status::Unknown(code),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Status::Informational(s) => s.code(),
            Status::Success(s) => s.code(),
            Status::Redirection(s) => s.code(),
            Status::ClientError(s) => s.code(),
            Status::ServerError(s) => s.code(),
            Status::Unknown(code) => *code,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            Status::Informational(s) => s.reason_phrase(),
            Status::Success(s) => s.reason_phrase(),
            Status::Redirection(s) => s.reason_phrase(),
            Status::ClientError(s) => s.reason_phrase(),
            Status::ServerError(s) => s.reason_phrase(),
            Status::Unknown(_) => UNNAMED_REASON,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Status::Informational(_) => Category::Informational,
            Status::Success(_) => Category::Success,
            Status::Redirection(_) => Category::Redirection,
            Status::ClientError(_) => Category::ClientError,
            Status::ServerError(_) => Category::ServerError,
            Status::Unknown(_) => Category::Unknown,
        }
    }

    pub fn is_success(&self) -> bool {
        self.category() == Category::Success
    }

    /// Whether a response with this status can carry a body.
    ///
    /// 1xx, 204 and 304 responses never do.
    pub fn permits_body(&self) -> bool {
        !(self.category() == Category::Informational || matches!(self.code(), 204 | 304))
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Status::from_code(code)
    }
}

impl From<Informational> for Status {
    fn from(status: Informational) -> Self {
        Status::Informational(status)
    }
}

impl From<Success> for Status {
    fn from(status: Success) -> Self {
        Status::Success(status)
    }
}

impl From<Redirection> for Status {
    fn from(status: Redirection) -> Self {
        Status::Redirection(status)
    }
}

impl From<ClientError> for Status {
    fn from(status: ClientError) -> Self {
        Status::ClientError(status)
    }
}

impl From<ServerError> for Status {
    fn from(status: ServerError) -> Self {
        Status::ServerError(status)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason_phrase())
    }
}
