//! Cell style snapshot read straight from the .xlsx package
//!
//! calamine only exposes values, so formatting is decoded from the OOXML
//! parts: `xl/workbook.xml` and its relationships locate each worksheet,
//! `xl/styles.xml` provides fonts, fills, borders, alignment and number
//! formats, and every worksheet part provides the per-cell style index plus
//! row heights and column widths.
//!
//! Positions are zero-based `(row, column)` pairs, the same coordinates
//! rust_xlsxwriter writes to.

use crate::error::{MaudeError, MaudeResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern, FormatUnderline};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Cursor, Read};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

/// Excel's last column (XFD)
pub const MAX_COLUMNS: u32 = 16_384;

//==============================================================================
// Style records
//==============================================================================

/// A color as the writer can reproduce it. Indexed colors and theme colors
/// with a tint outside the standard palette shades are resolved to RGB when
/// captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleColor {
    Rgb(u32),
    /// Theme palette entry (0-9) and shade (0-5), as in `Color::Theme`
    Theme(u8, u8),
    /// System color (`auto="1"`, indexed 64 or 65)
    Auto,
}

impl StyleColor {
    fn from_element(e: &BytesStart<'_>, theme: &ThemePalette) -> Option<Self> {
        if let Some(rgb) = attr(e, b"rgb") {
            // ARGB; alpha is ignored
            let digits = rgb.get(rgb.len().saturating_sub(6)..)?;
            return u32::from_str_radix(digits, 16).ok().map(StyleColor::Rgb);
        }
        if let Some(indexed) = attr(e, b"indexed") {
            let index: usize = indexed.parse().ok()?;
            return match INDEXED_PALETTE.get(index) {
                Some(&rgb) => Some(StyleColor::Rgb(rgb)),
                None => Some(StyleColor::Auto),
            };
        }
        if let Some(index) = attr(e, b"theme") {
            let index: u8 = index.parse().ok()?;
            let tint = attr(e, b"tint")
                .and_then(|t| t.parse::<f64>().ok())
                .unwrap_or(0.0);
            return theme.color(index, tint);
        }
        if attr(e, b"auto").is_some() {
            return Some(StyleColor::Auto);
        }
        None
    }

    /// Concrete color for the writer. Automatic colors fall back to the
    /// writer's defaults.
    pub fn to_color(self) -> Option<Color> {
        match self {
            StyleColor::Rgb(rgb) => Some(Color::RGB(rgb)),
            StyleColor::Theme(index, shade) => Some(Color::Theme(index, shade)),
            StyleColor::Auto => None,
        }
    }
}

//==============================================================================
// Theme palette
//==============================================================================

/// Tints the writer emits for shades 1-5 of theme entries 0, 1 and 2
const THEME_SHADE_TINTS: [[f64; 5]; 3] = [
    [
        -0.049989318521683403,
        -0.14999847407452621,
        -0.249977111117893,
        -0.34998626667073579,
        -0.499984740745262,
    ],
    [
        0.499984740745262,
        0.34998626667073579,
        0.249977111117893,
        0.14999847407452621,
        0.049989318521683403,
    ],
    [
        -0.099978637043366805,
        -0.249977111117893,
        -0.499984740745262,
        -0.749992370372631,
        -0.89999084444715716,
    ],
];

/// Tints for shades 1-5 of theme entries 3-9
const ACCENT_SHADE_TINTS: [f64; 5] = [
    0.79998168889431442,
    0.59999389629810485,
    0.39997558519241921,
    -0.249977111117893,
    -0.499984740745262,
];

/// Office default palette, used when the package has no theme part
const DEFAULT_THEME: [u32; 12] = [
    0xFFFFFF, 0x000000, 0xEEECE1, 0x1F497D, 0x4F81BD, 0xC0504D, 0x9BBB59, 0x8064A2, 0x4BACC6,
    0xF79646, 0x0000FF, 0x800080,
];

/// Workbook theme colors in the order the `theme` attribute indexes them:
/// lt1, dk1, lt2, dk2, accent1-6, hlink, folHlink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette([u32; 12]);

impl Default for ThemePalette {
    fn default() -> Self {
        ThemePalette(DEFAULT_THEME)
    }
}

impl ThemePalette {
    /// Parse `<a:clrScheme>` from a theme part. Missing entries keep the
    /// default palette's value.
    pub fn parse(xml: &str) -> MaudeResult<Self> {
        let mut colors = DEFAULT_THEME;
        let mut reader = Reader::from_str(xml);
        let mut slot: Option<usize> = None;
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"lt1" => slot = Some(0),
                    b"dk1" => slot = Some(1),
                    b"lt2" => slot = Some(2),
                    b"dk2" => slot = Some(3),
                    b"accent1" => slot = Some(4),
                    b"accent2" => slot = Some(5),
                    b"accent3" => slot = Some(6),
                    b"accent4" => slot = Some(7),
                    b"accent5" => slot = Some(8),
                    b"accent6" => slot = Some(9),
                    b"hlink" => slot = Some(10),
                    b"folHlink" => slot = Some(11),
                    name @ (b"srgbClr" | b"sysClr") => {
                        let key: &[u8] = if name == b"srgbClr" { b"val" } else { b"lastClr" };
                        if let (Some(index), Some(rgb)) = (
                            slot.take(),
                            attr(&e, key).and_then(|v| u32::from_str_radix(&v, 16).ok()),
                        ) {
                            colors[index] = rgb;
                        }
                    }
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"clrScheme" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(ThemePalette(colors))
    }

    /// Theme reference with tint. Shades the writer can express stay theme
    /// colors; anything else is resolved to RGB.
    pub fn color(&self, index: u8, tint: f64) -> Option<StyleColor> {
        if index <= 9 {
            if tint.abs() < 1e-6 {
                return Some(StyleColor::Theme(index, 0));
            }
            let tints = match index {
                0..=2 => &THEME_SHADE_TINTS[index as usize],
                _ => &ACCENT_SHADE_TINTS,
            };
            if let Some(shade) = tints.iter().position(|t| (t - tint).abs() < 1e-6) {
                return Some(StyleColor::Theme(index, shade as u8 + 1));
            }
        }
        let base = *self.0.get(index as usize)?;
        Some(StyleColor::Rgb(apply_tint(base, tint)))
    }
}

/// Excel's tint rule: scale HLS luminance toward black (negative tint) or
/// white (positive tint)
fn apply_tint(rgb: u32, tint: f64) -> u32 {
    if tint.abs() < 1e-9 {
        return rgb;
    }
    let channel = |shift: u32| ((rgb >> shift) & 0xFF) as f64 / 255.0;
    let (h, l, s) = rgb_to_hls(channel(16), channel(8), channel(0));
    let l = if tint < 0.0 {
        l * (1.0 + tint)
    } else {
        l * (1.0 - tint) + tint
    };
    let (r, g, b) = hls_to_rgb(h, l.clamp(0.0, 1.0), s);
    let byte = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u32;
    (byte(r) << 16) | (byte(g) << 8) | byte(b)
}

fn rgb_to_hls(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if max == min {
        return (0.0, l, 0.0);
    }
    let d = max - min;
    let s = if l <= 0.5 {
        d / (max + min)
    } else {
        d / (2.0 - max - min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h / 6.0, l, s)
}

fn hls_to_rgb(h: f64, l: f64, s: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (l, l, l);
    }
    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |mut t: f64| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    (hue(h + 1.0 / 3.0), hue(h), hue(h - 1.0 / 3.0))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontStyle {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: Option<String>,
    pub color: Option<StyleColor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillStyle {
    pub pattern: Option<String>,
    pub foreground: Option<StyleColor>,
    pub background: Option<StyleColor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentStyle {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
    /// Excel encoding: 0-90 counter-clockwise, 91-180 clockwise, 255 stacked
    pub rotation: Option<u16>,
    pub indent: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BorderEdge {
    pub style: String,
    pub color: Option<StyleColor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BorderStyle {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
}

/// Formatting captured for one cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellStyle {
    pub font: FontStyle,
    pub fill: FillStyle,
    pub alignment: AlignmentStyle,
    pub border: BorderStyle,
    pub number_format: String,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            font: FontStyle::default(),
            fill: FillStyle::default(),
            alignment: AlignmentStyle::default(),
            border: BorderStyle::default(),
            number_format: "General".to_string(),
        }
    }
}

impl CellStyle {
    /// Rebuild an equivalent rust_xlsxwriter format
    pub fn to_format(&self) -> Format {
        let mut format = Format::new();

        let font = &self.font;
        if let Some(name) = &font.name {
            format = format.set_font_name(name);
        }
        if let Some(size) = font.size {
            format = format.set_font_size(size);
        }
        if font.bold {
            format = format.set_bold();
        }
        if font.italic {
            format = format.set_italic();
        }
        if font.strikethrough {
            format = format.set_font_strikethrough();
        }
        if let Some(underline) = font.underline.as_deref().and_then(map_underline) {
            format = format.set_underline(underline);
        }
        if let Some(color) = font.color.and_then(StyleColor::to_color) {
            format = format.set_font_color(color);
        }

        if let Some(pattern) = self.fill.pattern.as_deref().and_then(map_pattern) {
            let fg = self.fill.foreground.and_then(StyleColor::to_color);
            let bg = self.fill.background.and_then(StyleColor::to_color);
            if matches!(pattern, FormatPattern::Solid) {
                // A colorless solid fill renders black; leave it unfilled
                if let Some(color) = fg.or(bg) {
                    format = format
                        .set_pattern(pattern)
                        .set_background_color(color);
                }
            } else {
                format = format.set_pattern(pattern);
                if let Some(color) = fg {
                    format = format.set_foreground_color(color);
                }
                if let Some(color) = bg {
                    format = format.set_background_color(color);
                }
            }
        }

        let alignment = &self.alignment;
        if let Some(align) = alignment.horizontal.as_deref().and_then(map_horizontal) {
            format = format.set_align(align);
        }
        if let Some(align) = alignment.vertical.as_deref().and_then(map_vertical) {
            format = format.set_align(align);
        }
        if alignment.wrap_text {
            format = format.set_text_wrap();
        }
        if let Some(rotation) = alignment.rotation.and_then(writer_rotation) {
            format = format.set_rotation(rotation);
        }
        if let Some(indent) = alignment.indent {
            format = format.set_indent(indent);
        }

        let border = &self.border;
        if let Some(edge) = &border.left {
            if let Some(style) = map_border(&edge.style) {
                format = format.set_border_left(style);
            }
            if let Some(color) = edge.color.and_then(StyleColor::to_color) {
                format = format.set_border_left_color(color);
            }
        }
        if let Some(edge) = &border.right {
            if let Some(style) = map_border(&edge.style) {
                format = format.set_border_right(style);
            }
            if let Some(color) = edge.color.and_then(StyleColor::to_color) {
                format = format.set_border_right_color(color);
            }
        }
        if let Some(edge) = &border.top {
            if let Some(style) = map_border(&edge.style) {
                format = format.set_border_top(style);
            }
            if let Some(color) = edge.color.and_then(StyleColor::to_color) {
                format = format.set_border_top_color(color);
            }
        }
        if let Some(edge) = &border.bottom {
            if let Some(style) = map_border(&edge.style) {
                format = format.set_border_bottom(style);
            }
            if let Some(color) = edge.color.and_then(StyleColor::to_color) {
                format = format.set_border_bottom_color(color);
            }
        }

        if self.number_format != "General" {
            format = match builtin_format_id(&self.number_format) {
                Some(id) => format.set_num_format_index(id),
                None => format.set_num_format(&self.number_format),
            };
        }

        format
    }
}

/// Inclusive, zero-based cell range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl CellRange {
    /// `A1:C4`, or a single `B2`
    pub fn parse(reference: &str) -> Option<Self> {
        let (first, last) = reference.split_once(':').unwrap_or((reference, reference));
        let (first_row, first_col) = parse_cell_ref(first)?;
        let (last_row, last_col) = parse_cell_ref(last)?;
        Some(Self {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        })
    }

    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }
}

/// Everything captured for one worksheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetStyles {
    pub cells: HashMap<(u32, u16), CellStyle>,
    /// Row heights in points, for rows that declare one
    pub row_heights: BTreeMap<u32, f64>,
    /// Column widths in character units as stored in the file, by letter
    pub column_widths: BTreeMap<String, f64>,
    pub hidden_rows: BTreeSet<u32>,
    pub hidden_columns: BTreeSet<u16>,
    pub merged_ranges: Vec<CellRange>,
    pub autofilter: Option<CellRange>,
    /// Frozen rows and columns above and left of the split
    pub freeze_panes: Option<(u32, u16)>,
}

impl SheetStyles {
    pub fn get(&self, row: u32, col: u16) -> Option<&CellStyle> {
        self.cells.get(&(row, col))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
            && self.row_heights.is_empty()
            && self.column_widths.is_empty()
            && self.hidden_rows.is_empty()
            && self.hidden_columns.is_empty()
            && self.merged_ranges.is_empty()
            && self.autofilter.is_none()
            && self.freeze_panes.is_none()
    }
}

/// Styles for every worksheet in a workbook, keyed by sheet name
#[derive(Debug, Clone, Default)]
pub struct WorkbookStyles {
    pub sheets: HashMap<String, SheetStyles>,
}

impl WorkbookStyles {
    pub fn sheet(&self, name: &str) -> Option<&SheetStyles> {
        self.sheets.get(name)
    }
}

//==============================================================================
// Capture
//==============================================================================

/// Snapshot the styles of every worksheet in an .xlsx package
pub fn capture_workbook_styles(bytes: &[u8]) -> MaudeResult<WorkbookStyles> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| MaudeError::Style("package has no xl/workbook.xml".into()))?;
    let rels_xml = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?
        .ok_or_else(|| MaudeError::Style("package has no workbook relationships".into()))?;

    let targets = parse_relationships(&rels_xml)?;

    let theme_part = targets
        .values()
        .find(|target| target.contains("theme/"))
        .map_or_else(|| "xl/theme/theme1.xml".to_string(), |t| normalize_target(t));
    let theme = match read_part(&mut archive, &theme_part)? {
        Some(xml) => ThemePalette::parse(&xml)?,
        None => ThemePalette::default(),
    };

    let cell_xfs = match read_part(&mut archive, "xl/styles.xml")? {
        Some(xml) => parse_stylesheet(&xml, &theme)?.resolve(),
        None => vec![CellStyle::default()],
    };

    let mut sheets = HashMap::new();
    for (name, rel_id) in parse_workbook_sheets(&workbook_xml)? {
        let Some(target) = targets.get(&rel_id) else {
            debug!(sheet = %name, "sheet has no relationship target");
            continue;
        };
        let part = normalize_target(target);
        match read_part(&mut archive, &part)? {
            Some(xml) => {
                let styles = parse_sheet_styles(&xml, &cell_xfs)?;
                debug!(
                    sheet = %name,
                    cells = styles.cells.len(),
                    rows = styles.row_heights.len(),
                    columns = styles.column_widths.len(),
                    "captured sheet styles"
                );
                sheets.insert(name, styles);
            }
            None => debug!(sheet = %name, part = %part, "worksheet part missing"),
        }
    }

    Ok(WorkbookStyles { sheets })
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> MaudeResult<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

fn normalize_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        format!("xl/{}", target.trim_start_matches("./"))
    }
}

/// Attribute value by local name, unescaped
fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| {
            let raw = std::str::from_utf8(&a.value).ok()?;
            Some(
                quick_xml::escape::unescape(raw)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| raw.to_string()),
            )
        })
}

/// `<b/>`, `<b val="1"/>` and `<b val="true"/>` are all on
fn flag(e: &BytesStart<'_>) -> bool {
    match attr(e, b"val") {
        None => true,
        Some(v) => v == "1" || v.eq_ignore_ascii_case("true"),
    }
}

fn index_attr(e: &BytesStart<'_>, name: &[u8]) -> usize {
    attr(e, name).and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn parse_workbook_sheets(xml: &str) -> MaudeResult<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                if let (Some(name), Some(id)) = (attr(&e, b"name"), attr(&e, b"id")) {
                    sheets.push((name, id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

fn parse_relationships(xml: &str) -> MaudeResult<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

//==============================================================================
// styles.xml
//==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Default)]
struct XfRecord {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: AlignmentStyle,
}

#[derive(Debug, Default)]
struct Stylesheet {
    num_formats: HashMap<u32, String>,
    fonts: Vec<FontStyle>,
    fills: Vec<FillStyle>,
    borders: Vec<BorderStyle>,
    cell_xfs: Vec<XfRecord>,
}

impl Stylesheet {
    /// One `CellStyle` per `cellXfs` entry, indexed like the `s` attribute
    fn resolve(&self) -> Vec<CellStyle> {
        self.cell_xfs
            .iter()
            .map(|xf| CellStyle {
                font: self.fonts.get(xf.font_id).cloned().unwrap_or_default(),
                fill: self.fills.get(xf.fill_id).cloned().unwrap_or_default(),
                alignment: xf.alignment.clone(),
                border: self.borders.get(xf.border_id).cloned().unwrap_or_default(),
                number_format: self
                    .num_formats
                    .get(&xf.num_fmt_id)
                    .cloned()
                    .or_else(|| builtin_format_code(xf.num_fmt_id).map(str::to_string))
                    .unwrap_or_else(|| "General".to_string()),
            })
            .collect()
    }
}

fn parse_alignment(e: &BytesStart<'_>) -> AlignmentStyle {
    AlignmentStyle {
        horizontal: attr(e, b"horizontal").filter(|h| h != "general"),
        vertical: attr(e, b"vertical").filter(|v| v != "bottom"),
        wrap_text: attr(e, b"wrapText").is_some_and(|v| v == "1" || v == "true"),
        rotation: attr(e, b"textRotation")
            .and_then(|r| r.parse().ok())
            .filter(|&r| r != 0),
        indent: attr(e, b"indent").and_then(|i| i.parse().ok()).filter(|&i| i != 0),
    }
}

fn parse_stylesheet(xml: &str, theme: &ThemePalette) -> MaudeResult<Stylesheet> {
    let mut reader = Reader::from_str(xml);
    let mut sheet = Stylesheet::default();

    let mut section = Section::None;
    let mut font = FontStyle::default();
    let mut fill = FillStyle::default();
    let mut border = BorderStyle::default();
    let mut edge: Option<(Side, BorderEdge)> = None;
    let mut xf = XfRecord::default();

    loop {
        let (e, empty) = match reader.read_event()? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(e) => {
                match (section, e.local_name().as_ref()) {
                    (_, b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs") => {
                        section = Section::None;
                    }
                    (Section::Fonts, b"font") => sheet.fonts.push(std::mem::take(&mut font)),
                    (Section::Fills, b"fill") => sheet.fills.push(std::mem::take(&mut fill)),
                    (Section::Borders, b"border") => {
                        sheet.borders.push(std::mem::take(&mut border));
                    }
                    (Section::Borders, b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end") => {
                        finish_edge(&mut border, edge.take());
                    }
                    (Section::CellXfs, b"xf") => sheet.cell_xfs.push(std::mem::take(&mut xf)),
                    _ => {}
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let name = e.local_name();
        match (section, name.as_ref()) {
            (_, b"numFmts") if !empty => section = Section::NumFmts,
            (_, b"fonts") if !empty => section = Section::Fonts,
            (_, b"fills") if !empty => section = Section::Fills,
            (_, b"borders") if !empty => section = Section::Borders,
            (_, b"cellXfs") if !empty => section = Section::CellXfs,

            (Section::NumFmts, b"numFmt") => {
                if let (Some(id), Some(code)) = (
                    attr(&e, b"numFmtId").and_then(|id| id.parse().ok()),
                    attr(&e, b"formatCode"),
                ) {
                    sheet.num_formats.insert(id, code);
                }
            }

            (Section::Fonts, b"font") => {
                font = FontStyle::default();
                if empty {
                    sheet.fonts.push(FontStyle::default());
                }
            }
            (Section::Fonts, b"b") => font.bold = flag(&e),
            (Section::Fonts, b"i") => font.italic = flag(&e),
            (Section::Fonts, b"strike") => font.strikethrough = flag(&e),
            (Section::Fonts, b"u") => {
                let kind = attr(&e, b"val").unwrap_or_else(|| "single".to_string());
                font.underline = (kind != "none").then_some(kind);
            }
            (Section::Fonts, b"sz") => font.size = attr(&e, b"val").and_then(|v| v.parse().ok()),
            (Section::Fonts, b"name") => font.name = attr(&e, b"val"),
            (Section::Fonts, b"color") => font.color = StyleColor::from_element(&e, theme),

            (Section::Fills, b"fill") => {
                fill = FillStyle::default();
                if empty {
                    sheet.fills.push(FillStyle::default());
                }
            }
            (Section::Fills, b"patternFill") => fill.pattern = attr(&e, b"patternType"),
            (Section::Fills, b"fgColor") => fill.foreground = StyleColor::from_element(&e, theme),
            (Section::Fills, b"bgColor") => fill.background = StyleColor::from_element(&e, theme),

            (Section::Borders, b"border") => {
                border = BorderStyle::default();
                if empty {
                    sheet.borders.push(BorderStyle::default());
                }
            }
            (Section::Borders, side @ (b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end")) => {
                let side = match side {
                    b"left" | b"start" => Side::Left,
                    b"right" | b"end" => Side::Right,
                    b"top" => Side::Top,
                    _ => Side::Bottom,
                };
                let current = attr(&e, b"style").map(|style| {
                    (
                        side,
                        BorderEdge {
                            style,
                            color: None,
                        },
                    )
                });
                if empty {
                    finish_edge(&mut border, current);
                } else {
                    edge = current;
                }
            }
            (Section::Borders, b"color") => {
                if let Some((_, current)) = edge.as_mut() {
                    current.color = StyleColor::from_element(&e, theme);
                }
            }

            (Section::CellXfs, b"xf") => {
                xf = XfRecord {
                    num_fmt_id: index_attr(&e, b"numFmtId") as u32,
                    font_id: index_attr(&e, b"fontId"),
                    fill_id: index_attr(&e, b"fillId"),
                    border_id: index_attr(&e, b"borderId"),
                    alignment: AlignmentStyle::default(),
                };
                if empty {
                    sheet.cell_xfs.push(std::mem::take(&mut xf));
                }
            }
            (Section::CellXfs, b"alignment") => xf.alignment = parse_alignment(&e),

            _ => {}
        }
    }

    if sheet.cell_xfs.is_empty() {
        sheet.cell_xfs.push(XfRecord::default());
    }
    Ok(sheet)
}

fn finish_edge(border: &mut BorderStyle, edge: Option<(Side, BorderEdge)>) {
    if let Some((side, edge)) = edge {
        let slot = match side {
            Side::Left => &mut border.left,
            Side::Right => &mut border.right,
            Side::Top => &mut border.top,
            Side::Bottom => &mut border.bottom,
        };
        *slot = Some(edge);
    }
}

//==============================================================================
// Worksheet parts
//==============================================================================

fn parse_sheet_styles(xml: &str, cell_xfs: &[CellStyle]) -> MaudeResult<SheetStyles> {
    let mut reader = Reader::from_str(xml);
    let mut styles = SheetStyles::default();

    let mut row: u32 = 0;
    let mut next_row: u32 = 0;
    let mut next_col: u16 = 0;

    loop {
        let e = match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => e,
            Event::Eof => break,
            _ => continue,
        };

        match e.local_name().as_ref() {
            b"col" => {
                let min: u32 = attr(&e, b"min").and_then(|v| v.parse().ok()).unwrap_or(1);
                let max: u32 = attr(&e, b"max").and_then(|v| v.parse().ok()).unwrap_or(min);
                let width = attr(&e, b"width").and_then(|v| v.parse::<f64>().ok());
                let hidden = attr(&e, b"hidden").is_some_and(|v| v == "1" || v == "true");
                for col in min.max(1)..=max.min(MAX_COLUMNS) {
                    let col = (col - 1) as u16;
                    if let Some(width) = width {
                        styles.column_widths.insert(column_letter(col), width);
                    }
                    if hidden {
                        styles.hidden_columns.insert(col);
                    }
                }
            }
            b"row" => {
                row = attr(&e, b"r")
                    .and_then(|r| r.parse::<u32>().ok())
                    .map_or(next_row, |r| r.saturating_sub(1));
                next_row = row + 1;
                next_col = 0;
                if let Some(height) = attr(&e, b"ht").and_then(|h| h.parse::<f64>().ok()) {
                    styles.row_heights.insert(row, height);
                }
                if attr(&e, b"hidden").is_some_and(|v| v == "1" || v == "true") {
                    styles.hidden_rows.insert(row);
                }
            }
            b"pane" => {
                let frozen = attr(&e, b"state").is_some_and(|s| s.starts_with("frozen"));
                if frozen {
                    let split = |name: &[u8]| {
                        attr(&e, name)
                            .and_then(|v| v.parse::<f64>().ok())
                            .map_or(0.0, f64::round)
                    };
                    let rows = split(b"ySplit") as u32;
                    let cols = split(b"xSplit") as u16;
                    if rows > 0 || cols > 0 {
                        styles.freeze_panes = Some((rows, cols));
                    }
                }
            }
            b"mergeCell" => {
                if let Some(range) = attr(&e, b"ref").and_then(|r| CellRange::parse(&r)) {
                    styles.merged_ranges.push(range);
                }
            }
            b"autoFilter" => {
                styles.autofilter = attr(&e, b"ref").and_then(|r| CellRange::parse(&r));
            }
            b"c" => {
                let (cell_row, cell_col) = attr(&e, b"r")
                    .and_then(|r| parse_cell_ref(&r))
                    .unwrap_or((row, next_col));
                next_col = cell_col.saturating_add(1);
                let Some(index) = attr(&e, b"s").and_then(|s| s.parse::<usize>().ok()) else {
                    continue;
                };
                if let Some(style) = cell_xfs.get(index) {
                    styles.cells.insert((cell_row, cell_col), style.clone());
                }
            }
            _ => {}
        }
    }

    Ok(styles)
}

//==============================================================================
// Cell references
//==============================================================================

/// Zero-based column index to letters (0 → A, 26 → AA)
pub fn column_letter(col: u16) -> String {
    let mut result = String::new();
    let mut num = col as u32;
    loop {
        let remainder = num % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if num < 26 {
            break;
        }
        num = num / 26 - 1;
    }
    result
}

/// Letters to zero-based column index (A → 0, AA → 26)
pub fn column_index(letters: &str) -> Option<u16> {
    if letters.is_empty() {
        return None;
    }
    let mut n: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        n = n * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        if n > MAX_COLUMNS {
            return None;
        }
    }
    Some((n - 1) as u16)
}

/// `B12` → `(11, 1)`
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u16)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = column_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col))
}

//==============================================================================
// Mapping tables
//==============================================================================

fn map_underline(kind: &str) -> Option<FormatUnderline> {
    match kind {
        "single" => Some(FormatUnderline::Single),
        "double" => Some(FormatUnderline::Double),
        "singleAccounting" => Some(FormatUnderline::SingleAccounting),
        "doubleAccounting" => Some(FormatUnderline::DoubleAccounting),
        _ => None,
    }
}

fn map_pattern(pattern: &str) -> Option<FormatPattern> {
    let pattern = match pattern {
        "solid" => FormatPattern::Solid,
        "mediumGray" => FormatPattern::MediumGray,
        "darkGray" => FormatPattern::DarkGray,
        "lightGray" => FormatPattern::LightGray,
        "darkHorizontal" => FormatPattern::DarkHorizontal,
        "darkVertical" => FormatPattern::DarkVertical,
        "darkDown" => FormatPattern::DarkDown,
        "darkUp" => FormatPattern::DarkUp,
        "darkGrid" => FormatPattern::DarkGrid,
        "darkTrellis" => FormatPattern::DarkTrellis,
        "lightHorizontal" => FormatPattern::LightHorizontal,
        "lightVertical" => FormatPattern::LightVertical,
        "lightDown" => FormatPattern::LightDown,
        "lightUp" => FormatPattern::LightUp,
        "lightGrid" => FormatPattern::LightGrid,
        "lightTrellis" => FormatPattern::LightTrellis,
        "gray125" => FormatPattern::Gray125,
        "gray0625" => FormatPattern::Gray0625,
        _ => return None,
    };
    Some(pattern)
}

fn map_horizontal(align: &str) -> Option<FormatAlign> {
    match align {
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "centerContinuous" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        _ => None,
    }
}

fn map_vertical(align: &str) -> Option<FormatAlign> {
    match align {
        "top" => Some(FormatAlign::Top),
        "center" => Some(FormatAlign::VerticalCenter),
        "justify" => Some(FormatAlign::VerticalJustify),
        "distributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}

fn map_border(style: &str) -> Option<FormatBorder> {
    let border = match style {
        "thin" => FormatBorder::Thin,
        "medium" => FormatBorder::Medium,
        "dashed" => FormatBorder::Dashed,
        "dotted" => FormatBorder::Dotted,
        "thick" => FormatBorder::Thick,
        "double" => FormatBorder::Double,
        "hair" => FormatBorder::Hair,
        "mediumDashed" => FormatBorder::MediumDashed,
        "dashDot" => FormatBorder::DashDot,
        "mediumDashDot" => FormatBorder::MediumDashDot,
        "dashDotDot" => FormatBorder::DashDotDot,
        "mediumDashDotDot" => FormatBorder::MediumDashDotDot,
        "slantDashDot" => FormatBorder::SlantDashDot,
        _ => return None,
    };
    Some(border)
}

/// Excel's stored rotation to the writer's signed angle
fn writer_rotation(rotation: u16) -> Option<i16> {
    match rotation {
        0..=90 => Some(rotation as i16),
        91..=180 => Some(90 - rotation as i16),
        255 => Some(270),
        _ => None,
    }
}

const BUILTIN_FORMATS: &[(u8, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (5, "\"$\"#,##0_);(\"$\"#,##0)"),
    (6, "\"$\"#,##0_);[Red](\"$\"#,##0)"),
    (7, "\"$\"#,##0.00_);(\"$\"#,##0.00)"),
    (8, "\"$\"#,##0.00_);[Red](\"$\"#,##0.00)"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

fn builtin_format_code(id: u32) -> Option<&'static str> {
    BUILTIN_FORMATS
        .iter()
        .find(|(builtin, _)| *builtin as u32 == id)
        .map(|(_, code)| *code)
}

fn builtin_format_id(code: &str) -> Option<u8> {
    BUILTIN_FORMATS
        .iter()
        .find(|(_, builtin)| *builtin == code)
        .map(|(id, _)| *id)
}

/// Legacy indexed color palette (indices 0-63)
const INDEXED_PALETTE: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080,
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF,
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF,
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99,
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696,
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333,
];
