use std::io::{self, Stderr, Write};

const GLYPHS: [char; 4] = ['-', '\\', '|', '/'];

/// Rotating busy indicator shown while waiting for a free process slot
///
/// Output errors are ignored.
#[derive(Debug)]
pub struct Spinner<W: Write = Stderr> {
    position: usize,
    out: W,
}

impl Spinner<Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> Spinner<W> {
    pub fn new(out: W) -> Self {
        Self { position: 0, out }
    }

    pub fn current(&self) -> char {
        GLYPHS[self.position % GLYPHS.len()]
    }

    pub fn start(&mut self) {
        let glyph = self.current();
        self.emit(&glyph.to_string());
    }

    pub fn next(&mut self) {
        self.position += 1;
        let glyph = self.current();
        self.emit(&format!("\u{8}{glyph}"));
    }

    pub fn finish(&mut self) {
        self.emit("\u{8}  \u{8}\u{8}");
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        let _ = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush());
    }
}
