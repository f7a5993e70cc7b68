//! Plain-text tables for `Display` impls of schemas and shaders.

use std::fmt;

/// Write `rows` under `header` as left-aligned, space-padded columns.
pub(crate) fn write_table(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    header: &[&str],
    rows: &[Vec<String>],
) -> fmt::Result {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    writeln!(f, "{title}")?;
    write_row(f, &widths, header.iter().copied())?;
    for row in rows {
        write_row(f, &widths, row.iter().map(String::as_str))?;
    }
    Ok(())
}

fn write_row<'a>(
    f: &mut fmt::Formatter<'_>,
    widths: &[usize],
    cells: impl Iterator<Item = &'a str>,
) -> fmt::Result {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(f, "  {}", line.trim_end())
}
