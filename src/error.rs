use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum AppErrorCode {
    Unknown,
    MissingSysBasePath,
    MissingAppBasePath,
    MissingConfigPath,
    MissingDataStore,
    InvalidJsonFormat,
    InvalidInput,
    MissingAliasLogHdlerCfg,
    MissingAliasLoggerCfg,
    NoLogHandlerCfg,
    NoLoggerCfg,
    NoHandlerInLoggerCfg,
    FeatureDisabled,
    ExceedingMaxLimit,
    AcquireLockFailure,
    DataTableNotExist,
    DataCorruption,
    RemoteDbServerFailure,
    DatabaseServerBusy,
    VoucherNotExist,
    ShopNotExist,
    DuplicateRecord,
    TaskQueueOverflow,
    TaskQueueClosed,
    IOerror(std::io::ErrorKind),
} // end of AppErrorCode

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub detail: Option<String>,
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let default_detail = "none";
        let dp = if let Some(s) = &self.detail {
            s.as_str()
        } else {
            default_detail
        };
        write!(f, "code:{:?}, detail:{}", self.code, dp)
    }
}

impl From<(AppErrorCode, String)> for AppError {
    fn from(value: (AppErrorCode, String)) -> Self {
        AppError {
            code: value.0,
            detail: Some(value.1),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError {
            code: AppErrorCode::InvalidJsonFormat,
            detail: Some(value.to_string()),
        }
    }
}

#[cfg(feature = "mariadb")]
impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        let code = match &value {
            sqlx::Error::PoolTimedOut => AppErrorCode::DatabaseServerBusy,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => AppErrorCode::RemoteDbServerFailure,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::TypeNotFound { .. } => {
                AppErrorCode::DataCorruption
            }
            _others => AppErrorCode::RemoteDbServerFailure,
        };
        AppError {
            code,
            detail: Some(value.to_string()),
        }
    }
}
