use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use log::debug;

use crate::{
	block_scan::GridParams,
	error::{ExportError, Warning},
	shared_types::{
		ColorKey, CropClass, DataFormat, Depth, DitherMethod, ExportMode, ExportParameters,
		FontHeader, OutputFormat, PaletteKind, PaletteSettings, RleKind, Scheme, SchemeRequest,
	},
};


/// Converts an image into MSX-ready data tables.
#[derive(Parser, Debug)]
#[command(name = "img2msx", version)]
pub struct Args {
	/// Source image (PNG, BMP, or anything `image` can read)
	pub input: PathBuf,

	/// Output file, derived from the input when omitted
	#[arg(long)]
	pub out: Option<PathBuf>,

	/// Output format, guessed from the output extension with 'auto'
	#[arg(long, value_enum, default_value_t = FormatArg::Auto)]
	pub format: FormatArg,

	/// Data table name
	#[arg(long, default_value = "table")]
	pub name: String,

	#[arg(long, value_enum, default_value_t = ModeArg::Bmp)]
	pub mode: ModeArg,

	/// Start position of the first block
	#[arg(long, num_args = 2, value_names = ["X", "Y"])]
	pub pos: Option<Vec<u32>>,

	/// Block size, 0 exports the whole image
	#[arg(long, num_args = 2, value_names = ["X", "Y"])]
	pub size: Option<Vec<u32>>,

	/// Gap between blocks
	#[arg(long, num_args = 2, value_names = ["X", "Y"])]
	pub gap: Option<Vec<u32>>,

	/// Number of block columns and rows
	#[arg(long, num_args = 2, value_names = ["X", "Y"])]
	pub num: Option<Vec<u32>>,

	/// Transparency color (0xRRGGBB, #RRGGBB or decimal)
	#[arg(long, value_parser = parse_color)]
	pub trans: Option<u32>,

	/// Opacity color, every other color becomes transparent
	#[arg(long, value_parser = parse_color)]
	pub opacity: Option<u32>,

	/// Bits per color (1, 2, 4 or 8)
	#[arg(long, value_parser = parse_depth, default_value = "8")]
	pub bpc: Depth,

	#[arg(long, value_enum, default_value_t = PaletteArg::Msx1)]
	pub pal: PaletteArg,

	/// Number of palette entries, defaults to every slot after the offset
	#[arg(long)]
	pub palcount: Option<usize>,

	/// Index of the first palette entry
	#[arg(long, default_value_t = 1)]
	pub paloff: usize,

	/// Write palette entries as 24-bit RGB
	#[arg(long)]
	pub pal24: bool,

	#[arg(long, value_enum, default_value_t = CompressArg::None)]
	pub compress: CompressArg,

	/// Dithering for 1-bit exports
	#[arg(long, value_enum, default_value_t = DitherArg::None)]
	pub dither: DitherArg,

	/// Numeric style of text outputs
	#[arg(long, value_enum, default_value_t = DataArg::Hexa)]
	pub data: DataArg,

	/// Skip blocks without visible pixel
	#[arg(long)]
	pub skip: bool,

	/// Add a block index table
	#[arg(long)]
	pub idx: bool,

	/// Add a header table
	#[arg(long)]
	pub head: bool,

	/// Add copyright lines from a text file, defaults to <input>.txt
	#[arg(long, num_args = 0..=1, default_missing_value = "", value_name = "FILE")]
	pub copy: Option<String>,

	/// Font header: character size then first and last character
	#[arg(long, num_args = 4, value_names = ["X", "Y", "FIRST", "LAST"])]
	pub font: Option<Vec<String>>,

	/// Value added to every tile name
	#[arg(long, default_value_t = 0)]
	pub offset: u8,

	/// Address added to every index entry
	#[arg(long, value_parser = parse_address)]
	pub at: Option<u16>,

	/// Prefix binary output with a BLOAD header loading it at --at
	#[arg(long)]
	pub bload: bool,

	/// Prefix each table with an overridable define
	#[arg(long)]
	pub def: bool,

	/// Leave out the comment banner
	#[arg(long)]
	pub notitle: bool,
}


#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
	Auto,
	C,
	Asm,
	Bin,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
	Bmp,
	#[value(name = "gm2")]
	Gm2,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteArg {
	#[value(name = "msx1")]
	Msx1,
	Custom,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressArg {
	None,
	#[value(name = "crop16")]
	Crop16,
	#[value(name = "cropline16")]
	CropLine16,
	#[value(name = "crop32")]
	Crop32,
	#[value(name = "cropline32")]
	CropLine32,
	#[value(name = "crop256")]
	Crop256,
	#[value(name = "cropline256")]
	CropLine256,
	#[value(name = "rle0")]
	Rle0,
	#[value(name = "rle4")]
	Rle4,
	#[value(name = "rle8")]
	Rle8,
	Auto,
	Best,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DitherArg {
	None,
	Floyd,
	#[value(name = "bayer4")]
	Bayer4,
	#[value(name = "bayer8")]
	Bayer8,
	#[value(name = "bayer16")]
	Bayer16,
	#[value(name = "cluster6")]
	Cluster6,
	#[value(name = "cluster8")]
	Cluster8,
	#[value(name = "cluster16")]
	Cluster16,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataArg {
	#[value(name = "dec")]
	Dec,
	#[value(name = "hexa")]
	Hexa,
	#[value(name = "hexa0x")]
	HexaC,
	#[value(name = "hexaH")]
	HexaAsm,
	#[value(name = "hexa$")]
	HexaPascal,
	#[value(name = "hexa&H")]
	HexaBasic,
	#[value(name = "hexa&")]
	HexaAnd,
	#[value(name = "hexa#")]
	HexaSharp,
	#[value(name = "bin")]
	Bin,
	#[value(name = "bin0b")]
	BinC,
	#[value(name = "binB")]
	BinAsm,
}


/// Reads `0x`, `$` and `#` prefixed hexadecimal, or decimal.
fn parse_number(text: &str) -> Result<u32, String> {
	let text: &str = text.trim();
	let hex: Option<&str> = text.strip_prefix("0x")
		.or_else(|| text.strip_prefix("0X"))
		.or_else(|| text.strip_prefix('$'))
		.or_else(|| text.strip_prefix('#'));

	let parsed = match hex {
		Some(digits) => u32::from_str_radix(digits, 16),
		None => text.parse::<u32>(),
	};

	parsed.map_err(|_| format!("'{}' is not a number", text))
}


fn parse_color(text: &str) -> Result<u32, String> {
	let value: u32 = parse_number(text)?;
	if value > 0xFFFFFF {
		return Err(format!("'{}' is not a 24-bit color", text));
	}
	Ok(value)
}


fn parse_address(text: &str) -> Result<u16, String> {
	let value: u32 = parse_number(text)?;
	u16::try_from(value).map_err(|_| format!("'{}' is past the 16-bit address space", text))
}


fn parse_depth(text: &str) -> Result<Depth, String> {
	text.parse::<u8>()
		.ok()
		.and_then(Depth::from_bits)
		.ok_or_else(|| format!("invalid bits-per-color value '{}', only 1, 2, 4 or 8 are supported", text))
}


/// A single character stands for itself, anything longer is a number.
fn parse_char(text: &str) -> Result<u8, ExportError> {
	let value: u32 = match text.as_bytes() {
		[single] => *single as u32,
		_ => parse_number(text).map_err(ExportError::InvalidParameter)?,
	};

	u8::try_from(value).map_err(|_| ExportError::InvalidParameter(format!("font character '{}' does not fit a byte", text)))
}


fn pair(values: &Option<Vec<u32>>, default: (u32, u32)) -> (u32, u32) {
	match values.as_deref() {
		Some([x, y]) => (*x, *y),
		_ => default,
	}
}


/// Output dialect from a file extension.
pub fn detect_format(path: &Path) -> Option<OutputFormat> {
	let extension: String = path.extension()?.to_str()?.to_lowercase();

	match extension.as_str() {
		"h" | "inc" => Some(OutputFormat::C),
		"s" | "asm" => Some(OutputFormat::Asm),
		"bin" | "raw" => Some(OutputFormat::Bin),
		_ => None,
	}
}


fn resolve_output(args: &Args) -> Result<(PathBuf, OutputFormat), ExportError> {
	let explicit: Option<OutputFormat> = match args.format {
		FormatArg::Auto => None,
		FormatArg::C => Some(OutputFormat::C),
		FormatArg::Asm => Some(OutputFormat::Asm),
		FormatArg::Bin => Some(OutputFormat::Bin),
	};

	match (&args.out, explicit) {
		(Some(path), Some(format)) => Ok((path.clone(), format)),
		(Some(path), None) => match detect_format(path) {
			Some(format) => Ok((path.clone(), format)),
			None => Err(ExportError::UnknownOutputFormat(path.clone())),
		},
		(None, Some(format)) => Ok((args.input.with_extension(format.extension()), format)),
		(None, None) => Err(ExportError::InvalidParameter(String::from("an output file is required when the format is 'auto'"))),
	}
}


fn scheme_request(compress: CompressArg) -> SchemeRequest {
	match compress {
		CompressArg::None => SchemeRequest::Fixed(Scheme::None),
		CompressArg::Crop16 => SchemeRequest::Fixed(Scheme::Crop(CropClass::C16)),
		CompressArg::CropLine16 => SchemeRequest::Fixed(Scheme::CropLine(CropClass::C16)),
		CompressArg::Crop32 => SchemeRequest::Fixed(Scheme::Crop(CropClass::C32)),
		CompressArg::CropLine32 => SchemeRequest::Fixed(Scheme::CropLine(CropClass::C32)),
		CompressArg::Crop256 => SchemeRequest::Fixed(Scheme::Crop(CropClass::C256)),
		CompressArg::CropLine256 => SchemeRequest::Fixed(Scheme::CropLine(CropClass::C256)),
		CompressArg::Rle0 => SchemeRequest::Fixed(Scheme::Rle(RleKind::Rle0)),
		CompressArg::Rle4 => SchemeRequest::Fixed(Scheme::Rle(RleKind::Rle4)),
		CompressArg::Rle8 => SchemeRequest::Fixed(Scheme::Rle(RleKind::Rle8)),
		CompressArg::Auto => SchemeRequest::Auto,
		CompressArg::Best => SchemeRequest::Best,
	}
}


fn dither_method(dither: DitherArg) -> DitherMethod {
	match dither {
		DitherArg::None => DitherMethod::None,
		DitherArg::Floyd => DitherMethod::Floyd,
		DitherArg::Bayer4 => DitherMethod::Bayer4,
		DitherArg::Bayer8 => DitherMethod::Bayer8,
		DitherArg::Bayer16 => DitherMethod::Bayer16,
		DitherArg::Cluster6 => DitherMethod::Cluster6,
		DitherArg::Cluster8 => DitherMethod::Cluster8,
		DitherArg::Cluster16 => DitherMethod::Cluster16,
	}
}


fn data_format(data: DataArg) -> DataFormat {
	match data {
		DataArg::Dec => DataFormat::Decimal,
		DataArg::Hexa => DataFormat::Hexa,
		DataArg::HexaC => DataFormat::HexaC,
		DataArg::HexaAsm => DataFormat::HexaAsm,
		DataArg::HexaPascal => DataFormat::HexaPascal,
		DataArg::HexaBasic => DataFormat::HexaBasic,
		DataArg::HexaAnd => DataFormat::HexaAnd,
		DataArg::HexaSharp => DataFormat::HexaSharp,
		DataArg::Bin => DataFormat::Binary,
		DataArg::BinC => DataFormat::BinaryC,
		DataArg::BinAsm => DataFormat::BinaryAsm,
	}
}


/// Turns the command line into export parameters. Conflicting options fall
/// back to something that can run and are reported as warnings; only
/// options that leave nothing sensible to do are errors.
pub fn validate(args: &Args) -> Result<(ExportParameters, SchemeRequest, Vec<Warning>), ExportError> {
	let mut warnings: Vec<Warning> = Vec::new();

	let (output_path, output_format) = resolve_output(args)?;

	let mode: ExportMode = match args.mode {
		ModeArg::Bmp => ExportMode::Bitmap,
		ModeArg::Gm2 => ExportMode::Gm2,
	};

	let (pos_x, pos_y) = pair(&args.pos, (0, 0));
	let (size_x, size_y) = pair(&args.size, (0, 0));
	let (gap_x, gap_y) = pair(&args.gap, (0, 0));
	let (num_x, num_y) = pair(&args.num, (1, 1));

	let grid: GridParams = GridParams {
		pos_x,
		pos_y,
		size_x,
		size_y,
		gap_x,
		gap_y,
		num_x,
		num_y,
	};

	if mode == ExportMode::Bitmap && grid.is_whole_image() {
		warnings.push(Warning::WholeImage);
	}

	let key: ColorKey = match (args.trans, args.opacity) {
		(Some(color), Some(_)) => {
			warnings.push(Warning::OpacityDropped);
			ColorKey::Transparent(color)
		},
		(Some(color), None) => ColorKey::Transparent(color),
		(None, Some(color)) => ColorKey::Opaque(color),
		(None, None) => ColorKey::None,
	};

	// Tiles always use two 4-bit colors per line
	let depth: Depth = match mode {
		ExportMode::Gm2 => {
			if args.bpc != Depth::Four {
				debug!("Tile mode exports 4-bit colors, --bpc {} ignored", args.bpc.bits());
			}
			Depth::Four
		},
		ExportMode::Bitmap => args.bpc,
	};

	let mut request: SchemeRequest = scheme_request(args.compress);
	if mode == ExportMode::Gm2 && request != SchemeRequest::Fixed(Scheme::None) {
		warnings.push(Warning::SchemeIgnoredInTileMode);
		request = SchemeRequest::Fixed(Scheme::None);
	}

	if args.skip && !key.is_active() {
		warnings.push(Warning::SkipWithoutTransparency);
	}

	let mut dither: DitherMethod = dither_method(args.dither);
	if dither != DitherMethod::None && depth != Depth::One {
		warnings.push(Warning::DitherIgnored(depth.bits()));
		dither = DitherMethod::None;
	}

	let limit: usize = depth.color_count();
	let mut count: usize = args.palcount.unwrap_or_else(|| limit.saturating_sub(args.paloff).max(1));
	if count == 0 {
		count = 1;
		if depth.is_indexed() {
			warnings.push(Warning::PaletteCountRaised(count));
		}
	}

	let palette: PaletteSettings = PaletteSettings {
		kind: match args.pal {
			PaletteArg::Msx1 => PaletteKind::Reference,
			PaletteArg::Custom => PaletteKind::Custom,
		},
		count,
		offset: args.paloff,
		pal24: args.pal24,
	};

	let font: Option<FontHeader> = match args.font.as_deref() {
		Some([width, height, first, last]) => {
			let side = |text: &str| -> Result<u8, ExportError> {
				text.parse::<u8>()
					.ok()
					.filter(|&v| v <= 0x0F)
					.ok_or_else(|| ExportError::InvalidParameter(format!("font size '{}' must be between 0 and 15", text)))
			};

			Some(FontHeader {
				width: side(width.as_str())?,
				height: side(height.as_str())?,
				first: parse_char(first)?,
				last: parse_char(last)?,
			})
		},
		_ => None,
	};

	let mut bload: bool = args.bload;
	if bload && output_format != OutputFormat::Bin {
		warnings.push(Warning::BloadIgnored);
		bload = false;
	}

	let copyright: Option<String> = match &args.copy {
		Some(path) => {
			let path: PathBuf = if path.is_empty() {
				args.input.with_extension("txt")
			}
			else {
				PathBuf::from(path)
			};
			Some(fs::read_to_string(&path)?)
		},
		None => None,
	};

	let params: ExportParameters = ExportParameters {
		input_path: args.input.clone(),
		output_path,
		output_format,
		table_name: args.name.clone(),
		mode,
		grid,
		depth,
		key,
		palette,
		dither,
		data_format: data_format(args.data),
		skip_empty: args.skip,
		add_header: args.head,
		add_index: args.idx,
		define: args.def,
		title: !args.notitle,
		font,
		start_address: args.at.unwrap_or(0),
		bload,
		name_offset: args.offset,
		copyright,
	};

	Ok((params, request, warnings))
}
