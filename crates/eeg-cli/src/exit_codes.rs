pub const SUCCESS: i32 = 0;
/// At least one recording could not be processed
pub const RECORDING_FAILURE: i32 = 1;
/// Bad arguments or configuration; nothing was processed
pub const USAGE_ERROR: i32 = 2;
