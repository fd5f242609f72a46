//! Component G: output formatting. Two fixed right-aligned templates, matching §4.G exactly.
use crate::tree::Row;
use crate::units::human_readable;
use crate::users::UserNames;
use std::io::{self, Write as _};
use std::os::unix::ffi::OsStrExt as _;

/// Prints the header row (unless `--quiet`), matching the column layout of [`print_row`].
pub fn print_header(user_mode: bool, quiet: bool) {
    if quiet {
        return;
    }
    if user_mode {
        println!("{:>15} {:>15} {:>15} {}", "USER", "FILES", "SIZE", "PATH");
    } else {
        println!("{:>15} {:>15} {}", "FILES", "SIZE", "PATH");
    }
}

/// Prints one data row, converting `size` to a binary-unit string when `human_readable` is set.
///
/// The path is written out as raw bytes (`OsStrExt::as_bytes`), not through `Display`, so that a
/// non-UTF8 path is reproduced exactly rather than lossily replaced with U+FFFD.
pub fn print_row(row: &Row, user_names: &UserNames, human: bool) {
    let size = if human {
        human_readable(row.size)
    } else {
        row.size.to_string()
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let columns = match row.uid {
        Some(uid) => format!("{:>15} {:>15} {:>15} ", user_names.name_of(uid), row.count, size),
        None => format!("{:>15} {:>15} ", row.count, size),
    };
    let _ = out.write_all(columns.as_bytes());
    let _ = out.write_all(row.path.as_os_str().as_bytes());
    let _ = out.write_all(b"\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn non_user_row_has_two_numeric_columns() {
        let row = Row {
            uid: None,
            count: 3,
            size: 2048,
            path: PathBuf::from("/x"),
        };
        // Smoke check only: formatting panics are the failure mode worth catching here, the
        // exact column text is covered by `units::human_readable`'s own tests.
        print_row(&row, &UserNames::default(), true);
        print_row(&row, &UserNames::default(), false);
    }
}
