//! Plain-text grid files.
//!
//! The format is whitespace separated: two integers `rows cols`, then `rows * cols` decimal
//! numbers in row-major order. Writers put the header on its own line and one grid row per
//! line, each value with three decimals:
//!
//! ```text
//! 2 3
//! 0.000 1.000 2.000
//! 3.000 4.000 5.000
//! ```
//!
//! Readers accept any whitespace layout, so files edited by hand still load.

use crate::error::{ConvError, Result};
use crate::grid::Grid;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Parses a grid from its text form.
///
/// # Errors
///
/// Returns `ConvError::Parse` naming the header or the `[row][col]` element that is missing
/// or malformed, including a header with a zero dimension.
pub fn parse_array(text: &str) -> Result<Grid<f32>> {
    let mut tokens = text.split_whitespace();

    let mut dim = |name: &str| -> Result<usize> {
        let token = tokens.next().ok_or_else(|| parse_error("header", "missing dimensions"))?;
        token
            .parse::<usize>()
            .map_err(|_| parse_error("header", format!("invalid {} count {:?}", name, token)))
    };
    let rows = dim("row")?;
    let cols = dim("column")?;
    if rows == 0 || cols == 0 {
        return Err(parse_error(
            "header",
            format!("invalid dimensions {}x{}", rows, cols),
        ));
    }

    let size = rows.checked_mul(cols).ok_or_else(|| {
        parse_error("header", format!("dimensions {}x{} overflow", rows, cols))
    })?;

    // Every value takes at least one character and one separator, so the text bounds the
    // element count a well-formed file can hold.
    let mut data = Vec::with_capacity(size.min(text.len() / 2 + 1));
    for i in 0..rows {
        for j in 0..cols {
            let location = || format!("element [{}][{}]", i, j);
            let token = tokens
                .next()
                .ok_or_else(|| parse_error(location(), "unexpected end of input"))?;
            let value = token
                .parse::<f32>()
                .map_err(|_| parse_error(location(), format!("invalid number {:?}", token)))?;
            data.push(value);
        }
    }
    Grid::new(data, [rows, cols])
}

/// Formats a grid as text, three decimals per value.
pub fn format_array(grid: &Grid<f32>) -> String {
    let mut out = Vec::with_capacity(grid.len() * 8 + 16);
    // Writing to a Vec cannot fail, and the output is ASCII.
    let _ = write_grid(&mut out, grid);
    String::from_utf8_lossy(&out).into_owned()
}

/// Reads a grid from a text file.
pub fn read_array<P: AsRef<Path>>(path: P) -> Result<Grid<f32>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    parse_array(&text).map_err(|e| match e {
        ConvError::Parse { location, message } => ConvError::Parse {
            location: format!("{}: {}", path.display(), location),
            message,
        },
        other => other,
    })
}

/// Writes a grid to a text file, replacing any existing file.
pub fn write_array<P: AsRef<Path>>(path: P, grid: &Grid<f32>) -> Result<()> {
    let file = fs::File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_grid(&mut writer, grid)?;
    writer.flush()?;
    Ok(())
}

fn write_grid<W: Write>(writer: &mut W, grid: &Grid<f32>) -> std::io::Result<()> {
    writeln!(writer, "{} {}", grid.rows(), grid.cols())?;
    for row in grid.iter_rows() {
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                writer.write_all(b" ")?;
            }
            write!(writer, "{:.3}", value)?;
        }
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn parse_error(location: impl Into<String>, message: impl Into<String>) -> ConvError {
    ConvError::Parse {
        location: location.into(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_any_whitespace() {
        let grid = parse_array("2 3\n1 2\n3\t4 5\n\n6").unwrap();
        assert_eq!(grid.shape(), [2, 3]);
        assert_eq!(grid.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_array("").unwrap_err();
        assert_eq!(
            format!("{}", err),
            "Parse error at header: missing dimensions"
        );

        let err = parse_array("0 4").unwrap_err();
        assert!(format!("{}", err).contains("invalid dimensions 0x4"));

        let err = parse_array("2 2\n1 2 3").unwrap_err();
        assert_eq!(
            format!("{}", err),
            "Parse error at element [1][1]: unexpected end of input"
        );

        let err = parse_array("1 2\n1 x").unwrap_err();
        assert!(format!("{}", err).contains("element [0][1]"));

        let err = parse_array("-1 2").unwrap_err();
        assert!(matches!(err, ConvError::Parse { .. }));
    }

    #[test]
    fn test_oversized_header_is_parse_error() {
        let err = parse_array("4294967296 4294967296\n1.0").unwrap_err();
        match err {
            ConvError::Parse { location, message } => {
                assert_eq!(location, "header");
                assert!(message.contains("overflow"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }

        // Fits in usize but not in memory: the short body is what fails.
        let err = parse_array("3000000 3000000\n1.0").unwrap_err();
        assert_eq!(
            format!("{}", err),
            "Parse error at element [0][1]: unexpected end of input"
        );
    }

    #[test]
    fn test_format_three_decimals() {
        let grid = Grid::new(vec![0.0, 1.5, -2.25, 1.0 / 3.0], [2, 2]).unwrap();
        assert_eq!(format_array(&grid), "2 2\n0.000 1.500\n-2.250 0.333\n");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.txt");
        let grid = Grid::from_fn([3, 4], |i, j| i as f32 * 0.5 + j as f32 * 0.25);

        write_array(&path, &grid).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, format_array(&grid));

        let back = read_array(&path).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn test_read_errors_name_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        assert!(matches!(read_array(&missing), Err(ConvError::Io(_))));

        let bad = dir.path().join("bad.txt");
        fs::write(&bad, "2 2\n1 2 3").unwrap();
        match read_array(&bad) {
            Err(ConvError::Parse { location, .. }) => {
                assert!(location.contains("bad.txt"));
                assert!(location.ends_with("element [1][1]"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
