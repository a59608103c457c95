/// Static placement of the card grid inside the panel.
///
/// Cards tile row-major from the top-left corner; every column advances x by
/// `card_width * buffer_factor` and every row lowers y by
/// `card_height * buffer_factor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
    pub card_width: f32,
    pub card_height: f32,
    /// Spacing multiplier applied to each cell; must exceed 1 to leave a gap.
    pub buffer_factor: f32,
    /// Inset between the panel edge and the grid (the panel corner radius).
    pub margin: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        let card_width = 0.063;
        Self {
            rows: 6,
            cols: 4,
            card_width,
            card_height: card_width / 2.5 * 3.5,
            buffer_factor: 1.1,
            margin: 0.0025,
        }
    }
}

impl GridLayout {
    pub fn card_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn column_step(&self) -> f32 {
        self.card_width * self.buffer_factor
    }

    pub fn row_step(&self) -> f32 {
        self.card_height * self.buffer_factor
    }

    /// Width of the card area, excluding the margin.
    pub fn menu_width(&self) -> f32 {
        self.column_step() * self.cols as f32
    }

    /// Height of the card area, excluding the margin.
    pub fn menu_height(&self) -> f32 {
        self.row_step() * self.rows as f32
    }

    pub fn rest_position(&self, row: usize, col: usize) -> [f32; 3] {
        [
            self.margin - self.menu_width() / 2.0
                + self.card_width / 2.0
                + col as f32 * self.column_step(),
            -self.margin + self.menu_height() / 2.0
                - self.card_height / 2.0
                - row as f32 * self.row_step(),
            0.0,
        ]
    }

    /// Row and column of a row-major card index.
    pub fn cell(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.card_count() || self.cols == 0 {
            return None;
        }
        Some((index / self.cols, index % self.cols))
    }

    pub fn rest_position_for_index(&self, index: usize) -> Option<[f32; 3]> {
        self.cell(index)
            .map(|(row, col)| self.rest_position(row, col))
    }
}
