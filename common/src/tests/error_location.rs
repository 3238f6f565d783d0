use crate::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: Every error in the channel crates embeds an `ErrorLocation`.
/// If capture breaks, log lines for failed probes and fallbacks lose their origin.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - File path extraction breaks
/// - Line/column capture fails
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN: The line the location is captured on
    let expected_line = line!() + 3;

    // WHEN: Creating ErrorLocation from caller
    let location = ErrorLocation::from(Location::caller());

    // THEN: Should capture file, line, and column
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert_eq!(location.line, expected_line, "Should capture correct line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies the `[file:line:column]` Display format.
///
/// **WHY THIS MATTERS**: Error messages are written to the log file verbatim; the
/// bracketed suffix is what developers grep for.
///
/// **BUG THIS CATCHES**: Would catch if the Display implementation drops brackets
/// or one of the three components.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: An ErrorLocation
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Formatting as string
    let formatted = format!("{}", location);

    // THEN: Should produce "[file:line:column]" format
    assert!(formatted.starts_with('['), "Should start with '['");
    assert!(formatted.ends_with(']'), "Should end with ']'");
    assert!(
        formatted.contains(&format!(":{}:{}]", location.line, location.column)),
        "Should end with line and column"
    );
}

/// **VALUE**: Verifies that `#[track_caller]` propagation reports the call site.
///
/// **WHY THIS MATTERS**: Error constructors are `#[track_caller]`; without propagation
/// every error would point at the constructor instead of the failing operation.
///
/// **BUG THIS CATCHES**: Would catch if location propagation breaks in refactoring.
#[test]
fn given_multiple_call_sites_when_capturing_location_then_each_has_unique_line() {
    // GIVEN: A helper function that captures location
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    // WHEN: Capturing location from different call sites
    let loc1 = capture_location();
    let loc2 = capture_location();

    // THEN: Should have same file but sequential lines
    assert_eq!(loc1.file, loc2.file, "Should have same file");
    assert_eq!(loc1.line + 1, loc2.line, "Lines should be sequential");
}
