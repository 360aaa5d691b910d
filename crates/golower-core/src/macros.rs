/// Return early with an unsupported-construct error at the given position.
#[macro_export]
macro_rules! bail_unsupported {
    ($position:expr, $($arg:tt)*) => {
        return Err($crate::error::unsupported($position, format!($($arg)*)))
    };
}

/// Return early with an internal-consistency error.
#[macro_export]
macro_rules! bail_internal {
    ($($arg:tt)*) => {
        return Err($crate::error::internal(format!($($arg)*)))
    };
}
