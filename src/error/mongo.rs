//! Readable messages for MongoDB driver errors.
//!
//! Only the read path is exercised here, so the interesting kinds are
//! server command errors, authentication, argument validation and server
//! selection (the usual "cannot reach the store" failure).

use mongodb::error::ErrorKind;

/// Build a single-line message from a driver error.
///
/// Command errors carry the server code and, when known, its name:
/// `Unrecognized pipeline stage name: '$grup' (code 40324, UnrecognizedPipelineStage)`.
pub fn describe_mongodb_error(error: &mongodb::error::Error) -> String {
    match error.kind.as_ref() {
        ErrorKind::Command(command_error) => match get_error_name(command_error.code) {
            Some(name) => format!(
                "{} (code {}, {})",
                command_error.message, command_error.code, name
            ),
            None => format!("{} (code {})", command_error.message, command_error.code),
        },
        ErrorKind::Authentication { message, .. } => {
            format!("authentication failed: {message}")
        }
        ErrorKind::InvalidArgument { message, .. } => format!("invalid argument: {message}"),
        ErrorKind::ServerSelection { message, .. } => {
            format!("server selection failed: {message}")
        }
        _ => error.to_string(),
    }
}

/// Get a human-readable error name from a MongoDB error code.
fn get_error_name(code: i32) -> Option<&'static str> {
    let name = match code {
        2 => "BadValue",
        9 => "FailedToParse",
        13 => "Unauthorized",
        18 => "AuthenticationFailed",
        26 => "NamespaceNotFound",
        50 => "MaxTimeMSExpired",
        168 => "InvalidPipelineOperator",
        40324 => "UnrecognizedPipelineStage",
        _ => return None,
    };

    Some(name)
}
