use std::io::Write;

use beatdrop_core::{Color, Surface};

/// Rasterises draw calls onto a character grid and prints it to stdout.
#[derive(Debug)]
pub struct TerminalSurface {
    width: f32,
    height: f32,
    cols: usize,
    rows: usize,
    cells: Vec<char>,
}

impl TerminalSurface {
    pub fn new(width: f32, height: f32, cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            width,
            height,
            cols,
            rows,
            cells: vec![' '; cols * rows],
        }
    }

    fn cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        if x < 0.0 || y < 0.0 || x >= self.width || y >= self.height {
            return None;
        }
        let col = (x / self.width * self.cols as f32) as usize;
        let row = (y / self.height * self.rows as f32) as usize;
        Some((col.min(self.cols - 1), row.min(self.rows - 1)))
    }

    fn put(&mut self, col: usize, row: usize, glyph: char) {
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col] = glyph;
        }
    }

    pub fn row(&self, row: usize) -> String {
        self.cells[row * self.cols..(row + 1) * self.cols]
            .iter()
            .collect()
    }

    /// Writes the grid, homing the cursor first so frames overwrite each other.
    pub fn present(&self) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        write!(out, "\x1b[H")?;
        for row in 0..self.rows {
            writeln!(out, "{}\x1b[K", self.row(row))?;
        }
        out.flush()
    }
}

fn glyph_for(color: Color) -> char {
    match color {
        Color::BLUE => 'o',
        Color::GREEN => '@',
        Color::RED => '-',
        Color::BACKGROUND => ' ',
        _ => '#',
    }
}

impl Surface for TerminalSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self, _color: Color) {
        self.cells.fill(' ');
    }

    fn fill_rect(&mut self, origin: (f32, f32), size: (f32, f32), color: Color) {
        let span = |start: f32, len: f32, extent: f32, cells: usize| {
            let to_cell = |v: f32| v / extent * cells as f32;
            let first = to_cell(start.max(0.0)) as usize;
            let last = (to_cell((start + len).min(extent)).ceil().max(0.0) as usize).min(cells);
            first..last
        };
        let cols = span(origin.0, size.0, self.width, self.cols);
        let rows = span(origin.1, size.1, self.height, self.rows);

        for row in rows {
            for col in cols.clone() {
                self.put(col, row, glyph_for(color));
            }
        }
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Color) {
        let steps = self.cols.max(self.rows) * 2;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = from.0 + (to.0 - from.0) * t;
            let y = from.1 + (to.1 - from.1) * t;
            if let Some((col, row)) = self.cell(x.min(self.width - f32::EPSILON), y) {
                self.put(col, row, glyph_for(color));
            }
        }
    }

    fn fill_circle(&mut self, center: (f32, f32), _radius: f32, color: Color) {
        if let Some((col, row)) = self.cell(center.0, center.1) {
            self.put(col, row, glyph_for(color));
        }
    }

    fn text(&mut self, position: (f32, f32), text: &str, _color: Color) {
        let Some((col, row)) = self.cell(position.0, position.1) else {
            return;
        };
        for (offset, ch) in text.chars().enumerate() {
            self.put(col + offset, row, ch);
        }
    }
}
