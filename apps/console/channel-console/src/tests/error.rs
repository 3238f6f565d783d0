use crate::error::ConsoleError;

use common::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies that console errors carry their location in Display.
///
/// **WHY THIS MATTERS**: `main` returns these errors; the printed text is all an
/// operator sees when startup fails.
///
/// **BUG THIS CATCHES**: Would catch the `{location}` suffix being dropped from
/// a variant's format string.
#[test]
fn given_config_error_when_formatted_then_includes_message_and_location() {
    // GIVEN: A Config error
    let err = ConsoleError::Config {
        message: String::from("bad base_url"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Formatting the error as string
    let error_string = err.to_string();

    // THEN: Type, message, and file location are present
    assert!(error_string.contains("Config Error"));
    assert!(error_string.contains("bad base_url"));
    assert!(error_string.contains("error.rs"));
}
