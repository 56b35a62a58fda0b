//! Side-by-side Excel artifact: dataset 1 columns on the left, dataset 2
//! columns on the right, one row per join outcome, with cell fills
//! marking matches, differences, and one-sided rows.

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::{
    data::Cell,
    report::{ComparisonReport, Presence},
};

const BANNER_BLUE: u32 = 0x366092;
const HEADER_BLUE: u32 = 0x4472C4;
const DIFF_YELLOW: u32 = 0xFFEB9C;
const MATCH_GREEN: u32 = 0xC6EFCE;
const MISSING_RED: u32 = 0xFFC7CE;
const DIVIDER_GRAY: u32 = 0xD3D3D3;

const MIN_COLUMN_WIDTH: usize = 10;
const MAX_COLUMN_WIDTH: usize = 50;

struct Styles {
    banner: Format,
    header: Format,
    divider: Format,
    key: Format,
    matched: Format,
    differing: Format,
    missing: Format,
    plain: Format,
}

impl Styles {
    fn new() -> Self {
        let fill = |color: u32| {
            Format::new()
                .set_background_color(color)
                .set_border(FormatBorder::Thin)
        };
        Self {
            banner: fill(BANNER_BLUE)
                .set_bold()
                .set_font_color(0xFFFFFF)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            header: fill(HEADER_BLUE)
                .set_bold()
                .set_font_color(0xFFFFFF)
                .set_align(FormatAlign::Center),
            divider: fill(DIVIDER_GRAY)
                .set_bold()
                .set_align(FormatAlign::Center),
            key: Format::new().set_border(FormatBorder::Thin),
            matched: fill(MATCH_GREEN),
            differing: fill(DIFF_YELLOW),
            missing: fill(MISSING_RED),
            plain: Format::new().set_border(FormatBorder::Thin),
        }
    }
}

/// Writes `side_by_side_comparison.xlsx`: a merged banner row naming the
/// sections, a header row, then the merged table with key columns shown
/// once, the two value sections split by a `||` divider, and a status
/// column.
pub fn write_side_by_side(report: &ComparisonReport, path: &Path) -> Result<()> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Side by Side Comparison")
        .context("Naming comparison worksheet")?;

    let key_count = report.key_columns.len() as u16;
    let col_count = report.comparing_columns.len() as u16;
    let divider_col = key_count + col_count;
    let right_start = divider_col + 1;
    let status_col = right_start + col_count;
    let mut widths = vec![0usize; status_col as usize + 1];

    let left_name = report.summary.left_name.to_uppercase();
    let right_name = report.summary.right_name.to_uppercase();
    write_banner(worksheet, 0, key_count, "Keys", &styles.banner)?;
    write_banner(worksheet, key_count, col_count, &left_name, &styles.banner)?;
    worksheet
        .write_string_with_format(0, divider_col, "||", &styles.divider)
        .context("Writing banner divider")?;
    write_banner(worksheet, right_start, col_count, &right_name, &styles.banner)?;
    worksheet
        .write_string_with_format(0, status_col, "Status", &styles.banner)
        .context("Writing status banner")?;

    for (offset, name) in report.key_columns.iter().enumerate() {
        write_tracked(worksheet, 1, offset as u16, name, &styles.header, &mut widths)?;
    }
    for (offset, name) in report.comparing_columns.iter().enumerate() {
        write_tracked(
            worksheet,
            1,
            key_count + offset as u16,
            name,
            &styles.header,
            &mut widths,
        )?;
        write_tracked(
            worksheet,
            1,
            right_start + offset as u16,
            name,
            &styles.header,
            &mut widths,
        )?;
    }
    write_tracked(worksheet, 1, divider_col, "||", &styles.divider, &mut widths)?;
    write_tracked(
        worksheet,
        1,
        status_col,
        "Match Status",
        &styles.header,
        &mut widths,
    )?;

    for (row_idx, row) in report.rows.iter().enumerate() {
        let excel_row = row_idx as u32 + 2;
        for (offset, cell) in row.key.iter().enumerate() {
            write_tracked(
                worksheet,
                excel_row,
                offset as u16,
                &cell.as_display(),
                &styles.key,
                &mut widths,
            )?;
        }

        for offset in 0..report.comparing_columns.len() {
            let left_fill = side_fill(&styles, row.presence, Presence::LeftOnly, row, offset);
            write_tracked(
                worksheet,
                excel_row,
                key_count + offset as u16,
                &side_display(&row.left, offset),
                left_fill,
                &mut widths,
            )?;

            let right_fill = side_fill(&styles, row.presence, Presence::RightOnly, row, offset);
            write_tracked(
                worksheet,
                excel_row,
                right_start + offset as u16,
                &side_display(&row.right, offset),
                right_fill,
                &mut widths,
            )?;
        }
        write_tracked(
            worksheet,
            excel_row,
            divider_col,
            "||",
            &styles.divider,
            &mut widths,
        )?;

        let (status, status_fill) = match row.presence {
            Presence::Both if row.is_equal => ("Match".to_string(), &styles.matched),
            Presence::Both => ("Difference".to_string(), &styles.differing),
            one_sided => (
                one_sided.label(&report.summary.left_name, &report.summary.right_name),
                &styles.missing,
            ),
        };
        write_tracked(
            worksheet,
            excel_row,
            status_col,
            &status,
            status_fill,
            &mut widths,
        )?;
    }

    for (col, width) in widths.iter().enumerate() {
        let adjusted = (width + 2).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
        worksheet
            .set_column_width(col as u16, adjusted as f64)
            .context("Setting column width")?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Saving Excel report {path:?}"))?;
    Ok(())
}

fn write_banner(
    worksheet: &mut Worksheet,
    col: u16,
    span: u16,
    text: &str,
    format: &Format,
) -> Result<()> {
    match span {
        0 => {}
        1 => {
            worksheet
                .write_string_with_format(0, col, text, format)
                .with_context(|| format!("Writing banner '{text}'"))?;
        }
        _ => {
            worksheet
                .merge_range(0, col, 0, col + span - 1, text, format)
                .with_context(|| format!("Merging banner '{text}'"))?;
        }
    }
    Ok(())
}

fn write_tracked(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    format: &Format,
    widths: &mut [usize],
) -> Result<()> {
    if let Some(width) = widths.get_mut(col as usize) {
        *width = (*width).max(text.chars().count());
    }
    worksheet
        .write_string_with_format(row, col, text, format)
        .context("Writing worksheet cell")?;
    Ok(())
}

/// Fill for one value cell. The side a one-sided row exists on is marked
/// red; the empty opposite side stays unfilled; matched pairs color per
/// the column verdict.
fn side_fill<'a>(
    styles: &'a Styles,
    presence: Presence,
    own_side: Presence,
    row: &crate::report::MergedRow,
    offset: usize,
) -> &'a Format {
    match presence {
        Presence::Both => {
            if row.column_match.get(offset).copied().unwrap_or(false) {
                &styles.matched
            } else {
                &styles.differing
            }
        }
        p if p == own_side => &styles.missing,
        _ => &styles.plain,
    }
}

fn side_display(side: &Option<Vec<Cell>>, offset: usize) -> String {
    side.as_ref()
        .and_then(|cells| cells.get(offset))
        .map(|cell| cell.as_display())
        .unwrap_or_default()
}
