//! Colour lookup tables
//!
//! Indexed images carry no colours of their own. The Director system palette
//! below is the default table for 8-bit casts; it is parsed once on first use
//! and never modified afterwards.

use std::sync::LazyLock;

/// One palette colour, 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

/// Immutable index → colour table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgba>,
}

impl Palette {
    /// Build a palette from packed colour entries
    ///
    /// Each entry is `stride` bytes; `order` gives the byte positions of the
    /// red, green and blue channels inside an entry. Alpha is always 255.
    /// A trailing partial entry is ignored.
    pub fn from_bytes(bytes: &[u8], stride: usize, order: [usize; 3]) -> Self {
        let colors = bytes
            .chunks_exact(stride.max(1))
            .filter(|entry| order.iter().all(|&i| i < entry.len()))
            .map(|entry| Rgba {
                r: entry[order[0]],
                g: entry[order[1]],
                b: entry[order[2]],
                a: 255,
            })
            .collect();
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colour for a pixel index, if the table has one
    pub fn get(&self, index: u8) -> Option<Rgba> {
        self.colors.get(index as usize).copied()
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }
}

/// Director system palette as packed RGB triplets
const DIRECTOR_PALETTE_RAW: &str = concat!(
    "000000111111222222444444555555777777888888aaaaaa",
    "bbbbbbddddddeeeeee000011000022000044000055000077",
    "0000880000aa0000bb0000dd0000ee001100002200004400",
    "00550000770000880000aa0000bb0000dd0000ee00110000",
    "220000440000550000770000880000aa0000bb0000dd0000",
    "ee00000000330000660000990000cc0000ff003300003333",
    "0033660033990033cc0033ff006600006633006666006699",
    "0066cc0066ff0099000099330099660099990099cc0099ff",
    "00cc0000cc3300cc6600cc9900cccc00ccff00ff0000ff33",
    "00ff6600ff9900ffcc00ffff330000330033330066330099",
    "3300cc3300ff3333003333333333663333993333cc3333ff",
    "3366003366333366663366993366cc3366ff339900339933",
    "3399663399993399cc3399ff33cc0033cc3333cc6633cc99",
    "33cccc33ccff33ff0033ff3333ff6633ff9933ffcc33ffff",
    "6600006600336600666600996600cc6600ff663300663333",
    "6633666633996633cc6633ff666600666633666666666699",
    "6666cc6666ff6699006699336699666699996699cc6699ff",
    "66cc0066cc3366cc6666cc9966cccc66ccff66ff0066ff33",
    "66ff6666ff9966ffcc66ffff990000990033990066990099",
    "9900cc9900ff9933009933339933669933999933cc9933ff",
    "9966009966339966669966999966cc9966ff999900999933",
    "9999669999999999cc9999ff99cc0099cc3399cc6699cc99",
    "99cccc99ccff99ff0099ff3399ff6699ff9999ffcc99ffff",
    "cc0000cc0033cc0066cc0099cc00cccc00ffcc3300cc3333",
    "cc3366cc3399cc33cccc33ffcc6600cc6633cc6666cc6699",
    "cc66cccc66ffcc9900cc9933cc9966cc9999cc99cccc99ff",
    "cccc00cccc33cccc66cccc99ccccccccccffccff00ccff33",
    "ccff66ccff99ccffccccffffff0000ff0033ff0066ff0099",
    "ff00ccff00ffff3300ff3333ff3366ff3399ff33ccff33ff",
    "ff6600ff6633ff6666ff6699ff66ccff66ffff9900ff9933",
    "ff9966ff9999ff99ccff99ffffcc00ffcc33ffcc66ffcc99",
    "ffccccffccffffff00ffff33ffff66ffff99ffffccffffff",
);

/// Director system palette (256 entries)
pub static DIRECTOR_PALETTE: LazyLock<Palette> = LazyLock::new(|| {
    let bytes = hex::decode(DIRECTOR_PALETTE_RAW).expect("palette literal is valid hex");
    Palette::from_bytes(&bytes, 3, [0, 1, 2])
});
