use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::shared_types::Scheme;

/// Conditions that abort an export run.
#[derive(Error, Debug)]
pub enum ExportError {
	#[error("IO error: {0}")]
	Io(#[from] io::Error),

	#[error("Failed to decode PNG: {0}")]
	Png(#[from] png::DecodingError),

	#[error("Failed to decode image: {0}")]
	Image(#[from] image::ImageError),

	#[error("Bad BMP file '{path}': {reason}")]
	Bmp { path: PathBuf, reason: String },

	#[error("Unsupported PNG layout in '{0}'")]
	PngLayout(PathBuf),

	#[error("Block {index} at {x},{y} ({width}x{height}) lies outside the {image_width}x{image_height} image")]
	BlockOutOfBounds {
		index: usize,
		x: u32,
		y: u32,
		width: u32,
		height: u32,
		image_width: u32,
		image_height: u32,
	},

	#[error("Image is {0}x{1}, tile mode needs at least one 8x8 cell")]
	TooSmallForTiles(u32, u32),

	#[error("Invalid parameter: {0}")]
	InvalidParameter(String),

	#[error("Cannot guess the output format of '{0}', use --format")]
	UnknownOutputFormat(PathBuf),

	#[error("{size} bytes loaded at 0x{start:04X} run past the end of the 64 KiB address space")]
	BloadTooLarge { start: u16, size: usize },
}


/// Recoverable conflicts; the run continues with the stated fallback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
	#[error("Transparency and opacity colors can't be used together, opacity color ignored")]
	OpacityDropped,

	#[error("Block size is 0, the whole image will be exported")]
	WholeImage,

	#[error("{0} can't be used without a transparency color, compression removed")]
	SchemeNeedsTransparency(Scheme),

	#[error("RLE compression only works with 4 and 8-bits colors, compression removed")]
	RleNeedsDepth,

	#[error("RLE4 has no advantage with 8-bits colors, RLE8 will be used instead")]
	Rle4Upgraded,

	#[error("{scheme} can't describe {width}x{height} blocks, compression removed")]
	BlockTooLarge { scheme: Scheme, width: u32, height: u32 },

	#[error("Skipping empty blocks has no effect without a transparency color")]
	SkipWithoutTransparency,

	#[error("Palette offset {offset} plus count {count} exceeds {limit} colors, continuing with {clamped} colors")]
	PaletteCountClamped { offset: usize, count: usize, limit: usize, clamped: usize },

	#[error("Palette count can't be less than 1, continuing with {0} colors")]
	PaletteCountRaised(usize),

	#[error("Dithering only works with 1-bit colors (current is {0}-bits), dithering ignored")]
	DitherIgnored(u8),

	#[error("Compression is ignored in tile mode")]
	SchemeIgnoredInTileMode,

	#[error("Cell {column},{row} line {line} holds more than 2 colors, extra colors approximated")]
	TileRowOverflow { column: u32, row: u32, line: u32 },

	#[error("{0} unique tiles do not fit a byte-wide name table, names are written as words")]
	WideNames(usize),

	#[error("Compression benchmark found no usable scheme, falling back to no compression")]
	NoSchemeFound,

	#[error("BLOAD header only applies to binary output, option ignored")]
	BloadIgnored,

	#[error("Block {block} starts {offset} bytes into the data table, index entries from there on wrap at 16 bits")]
	IndexOffsetOverflow { block: usize, offset: u32 },
}
