use std::fmt;
use std::path::PathBuf;

use crate::block_scan::GridParams;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Index table value of a block skipped because it held no visible pixel.
pub const NO_ENTRY: u16 = 0x8000;


#[derive(Clone, Debug)]
pub struct ExportParameters {
	pub input_path: PathBuf,
	pub output_path: PathBuf,
	pub output_format: OutputFormat,
	pub table_name: String,
	pub mode: ExportMode,
	pub grid: GridParams,
	pub depth: Depth,
	pub key: ColorKey,
	pub palette: PaletteSettings,
	pub dither: DitherMethod,
	pub data_format: DataFormat,
	pub skip_empty: bool,
	pub add_header: bool,
	pub add_index: bool,
	pub define: bool,
	pub title: bool,
	pub font: Option<FontHeader>,
	pub start_address: u16,
	pub bload: bool,
	pub name_offset: u8,
	pub copyright: Option<String>,
}

impl Default for ExportParameters {
	fn default() -> ExportParameters {
		ExportParameters {
			input_path: PathBuf::new(),
			output_path: PathBuf::new(),
			output_format: OutputFormat::C,
			table_name: String::from("table"),
			mode: ExportMode::Bitmap,
			grid: GridParams::default(),
			depth: Depth::Eight,
			key: ColorKey::None,
			palette: PaletteSettings::default(),
			dither: DitherMethod::None,
			data_format: DataFormat::Hexa,
			skip_empty: false,
			add_header: false,
			add_index: false,
			define: false,
			title: true,
			font: None,
			start_address: 0,
			bload: false,
			name_offset: 0,
			copyright: None,
		}
	}
}


/// Bits per color in the exported data.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Depth {
	One,
	Two,
	Four,
	Eight,
}

impl Depth {
	pub fn from_bits(bits: u8) -> Option<Depth> {
		match bits {
			1 => Some(Depth::One),
			2 => Some(Depth::Two),
			4 => Some(Depth::Four),
			8 => Some(Depth::Eight),
			_ => None,
		}
	}

	pub fn bits(self) -> u8 {
		match self {
			Depth::One => 1,
			Depth::Two => 2,
			Depth::Four => 4,
			Depth::Eight => 8,
		}
	}

	pub fn pixels_per_byte(self) -> u32 {
		8 / self.bits() as u32
	}

	/// Number of codes addressable at this depth.
	pub fn color_count(self) -> usize {
		1usize << self.bits()
	}

	pub fn is_indexed(self) -> bool {
		self == Depth::Two || self == Depth::Four
	}
}


/// Which pixels count as transparent.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum ColorKey {
	None,
	/// Pixels of this color are transparent.
	Transparent(u32),
	/// Every pixel but this color is transparent.
	Opaque(u32),
}

impl ColorKey {
	pub fn is_active(self) -> bool {
		self != ColorKey::None
	}

	pub fn is_transparent(self, rgb: u32) -> bool {
		match self {
			ColorKey::None => false,
			ColorKey::Transparent(color) => rgb & 0xFFFFFF == color & 0xFFFFFF,
			ColorKey::Opaque(color) => rgb & 0xFFFFFF != color & 0xFFFFFF,
		}
	}
}


#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum PaletteKind {
	/// The fixed 16 colors of the platform.
	Reference,
	/// Generated from the image colors.
	Custom,
}

#[derive(Clone, Debug)]
pub struct PaletteSettings {
	pub kind: PaletteKind,
	pub count: usize,
	pub offset: usize,
	pub pal24: bool,
}

impl Default for PaletteSettings {
	fn default() -> PaletteSettings {
		PaletteSettings {
			kind: PaletteKind::Reference,
			count: 15,
			offset: 1,
			pal24: false,
		}
	}
}


#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum DitherMethod {
	None,
	Floyd,
	Bayer4,
	Bayer8,
	Bayer16,
	Cluster6,
	Cluster8,
	Cluster16,
}


#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum ExportMode {
	/// Grid of blocks, each run through the compression engine.
	Bitmap,
	/// Graphic mode 2 name / pattern / color tables.
	Gm2,
}


#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum OutputFormat {
	C,
	Asm,
	Bin,
}

impl OutputFormat {
	pub fn extension(self) -> &'static str {
		match self {
			OutputFormat::C => "h",
			OutputFormat::Asm => "asm",
			OutputFormat::Bin => "bin",
		}
	}
}


/// Spelling of numeric literals in text outputs.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum DataFormat {
	Decimal,
	Hexa,
	HexaC,
	HexaAsm,
	HexaPascal,
	HexaBasic,
	HexaAnd,
	HexaSharp,
	Binary,
	BinaryC,
	BinaryAsm,
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontHeader {
	pub width: u8,
	pub height: u8,
	pub first: u8,
	pub last: u8,
}


#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub enum CropClass {
	C16,
	C32,
	C256,
}

impl CropClass {
	/// Largest block side the class can describe.
	pub fn max_size(self) -> u32 {
		match self {
			CropClass::C16 => 16,
			CropClass::C32 => 32,
			CropClass::C256 => 256,
		}
	}
}


#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub enum RleKind {
	Rle0,
	Rle4,
	Rle8,
}

impl RleKind {
	pub fn max_length(self) -> usize {
		match self {
			RleKind::Rle0 => 0x7F,
			RleKind::Rle4 => 0x0F,
			RleKind::Rle8 => 0xFF,
		}
	}
}


#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub enum Scheme {
	None,
	Crop(CropClass),
	CropLine(CropClass),
	Rle(RleKind),
}

impl Scheme {
	/// Benchmark order; on equal sizes the earlier entry wins.
	pub const CANDIDATES: [Scheme; 10] = [
		Scheme::None,
		Scheme::Crop(CropClass::C16),
		Scheme::CropLine(CropClass::C16),
		Scheme::Crop(CropClass::C32),
		Scheme::CropLine(CropClass::C32),
		Scheme::Crop(CropClass::C256),
		Scheme::CropLine(CropClass::C256),
		Scheme::Rle(RleKind::Rle0),
		Scheme::Rle(RleKind::Rle4),
		Scheme::Rle(RleKind::Rle8),
	];

	/// Value stored in the header table.
	pub fn id(self) -> u8 {
		match self {
			Scheme::None => 0x00,
			Scheme::Crop(CropClass::C16) => 0x02,
			Scheme::CropLine(CropClass::C16) => 0x03,
			Scheme::Crop(CropClass::C32) => 0x04,
			Scheme::CropLine(CropClass::C32) => 0x05,
			Scheme::Crop(CropClass::C256) => 0x06,
			Scheme::CropLine(CropClass::C256) => 0x07,
			Scheme::Rle(RleKind::Rle0) => 0x08,
			Scheme::Rle(RleKind::Rle4) => 0x10,
			Scheme::Rle(RleKind::Rle8) => 0x18,
		}
	}

	pub fn from_id(id: u8) -> Option<Scheme> {
		Scheme::CANDIDATES.iter().copied().find(|scheme| scheme.id() == id)
	}

	pub fn short_name(self) -> &'static str {
		match self {
			Scheme::None => "None",
			Scheme::Crop(CropClass::C16) => "Crop16",
			Scheme::CropLine(CropClass::C16) => "CropLine16",
			Scheme::Crop(CropClass::C32) => "Crop32",
			Scheme::CropLine(CropClass::C32) => "CropLine32",
			Scheme::Crop(CropClass::C256) => "Crop256",
			Scheme::CropLine(CropClass::C256) => "CropLine256",
			Scheme::Rle(RleKind::Rle0) => "RLE0",
			Scheme::Rle(RleKind::Rle4) => "RLE4",
			Scheme::Rle(RleKind::Rle8) => "RLE8",
		}
	}

	pub fn description(self) -> &'static str {
		match self {
			Scheme::None => "None",
			Scheme::Crop(CropClass::C16) => "Crop16 (4-bits, max 16x16)",
			Scheme::CropLine(CropClass::C16) => "CropLine16 (4-bits per line, max 16x16)",
			Scheme::Crop(CropClass::C32) => "Crop32 (5-bits, max 32x32)",
			Scheme::CropLine(CropClass::C32) => "CropLine32 (5-bits per line, max 32x32)",
			Scheme::Crop(CropClass::C256) => "Crop256 (8-bits, max 256x256)",
			Scheme::CropLine(CropClass::C256) => "CropLine256 (8-bits per line, max 256x256)",
			Scheme::Rle(RleKind::Rle0) => "RLE0 (7-bits run-length encoding for transparency)",
			Scheme::Rle(RleKind::Rle4) => "RLE4 (4-bits run-length encoding)",
			Scheme::Rle(RleKind::Rle8) => "RLE8 (8-bits run-length encoding)",
		}
	}
}

impl fmt::Display for Scheme {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.description())
	}
}


/// How the compression scheme gets picked.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum SchemeRequest {
	Fixed(Scheme),
	Auto,
	Best,
}


/// Decoded source image, one `0xRRGGBB` value per pixel, top-down.
#[derive(Clone, Debug, Default)]
pub struct SourceImage {
	pub width: u32,
	pub height: u32,
	pub pixels: Vec<u32>,
}

impl SourceImage {
	pub fn pixel(&self, x: u32, y: u32) -> u32 {
		self.pixels[(y * self.width + x) as usize] & 0xFFFFFF
	}
}
