use crate::types::{Frame, Geometry, PlacedLine};

/// Centre `lines` horizontally and as a block vertically
///
/// Lines beyond the panel's capacity are dropped. Offsets may go negative when
/// a line is wider than the panel; the backend clips.
pub fn center_text(lines: &[String], geometry: Geometry, glyph_width: u32) -> Frame {
    let visible = &lines[..lines.len().min(geometry.max_lines())];
    center_block(visible, geometry, glyph_width, geometry.line_height())
}

/// Centre a block at a fixed pitch without truncating (used for the swim art)
pub fn center_block(
    lines: &[String],
    geometry: Geometry,
    glyph_width: u32,
    line_height: u32,
) -> Frame {
    let total_height = lines.len() as i32 * line_height as i32;
    let y0 = (geometry.height as i32 - total_height) / 2;

    let placed = lines
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let text_width = text.chars().count() as i32 * glyph_width as i32;
            PlacedLine {
                text: text.clone(),
                x: (geometry.width as i32 - text_width) / 2,
                y: y0 + i as i32 * line_height as i32,
            }
        })
        .collect();

    Frame {
        lines: placed,
        animation_frame: None,
    }
}
