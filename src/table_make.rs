use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::{
	bin_header::{self, BinHeader},
	bit_depth,
	block_compress::{self, BlockPixels},
	block_scan::{self, BlockRect, GridParams},
	color::ColorMapper,
	emitter::{Sink, TableEmitter, TableKind},
	error::{ExportError, Warning},
	image_transform,
	palette::{self, Palette},
	scheme,
	shared_types::{
		ColorKey, Depth, DitherMethod, ExportMode, ExportParameters, OutputFormat, PaletteKind,
		Scheme, SchemeRequest, SourceImage, NO_ENTRY, VERSION,
	},
	tile_gm2::{self, TileSet},
};


/// What an export run produced, besides its bytes.
#[derive(Clone, Debug, Default)]
pub struct ExportReport {
	pub scheme: Option<Scheme>,
	pub block_count: usize,
	pub skipped: usize,
	pub data_bytes: u32,
	pub total_bytes: u32,
	pub warnings: Vec<Warning>,
}

pub struct ExportOutcome {
	pub bytes: Vec<u8>,
	pub report: ExportReport,
}


/// Full run: dithering, palette, scheme choice, then every table into the
/// sink matching the output format.
pub fn export(image: SourceImage, params: &ExportParameters, request: SchemeRequest) -> Result<ExportOutcome, ExportError> {
	let mut warnings: Vec<Warning> = Vec::new();

	let image: SourceImage = if params.depth == Depth::One && params.dither != DitherMethod::None {
		debug!("Dithering with {:?}", params.dither);
		image_transform::dither(&image, params.dither, params.key)
	}
	else {
		image
	};

	let (palette, palette_warnings) = palette::build(params.depth, &params.palette, params.key, &image.pixels);
	warnings.extend(palette_warnings);
	let mapper: ColorMapper = ColorMapper::new(params.depth, palette, params.key);

	let mut sink: Sink = Sink::for_output(params.output_format, params.data_format, params.define);

	let mut report: ExportReport = match params.mode {
		ExportMode::Gm2 => {
			if params.title {
				sink.emitter().write_banner(&banner(params, None));
			}
			export_tiles(&image, &mapper, params, sink.emitter())?
		},

		ExportMode::Bitmap => {
			let grid: GridParams = params.grid.effective(image.width, image.height);
			let chosen: Scheme = match request {
				SchemeRequest::Fixed(requested) => {
					let (chosen, scheme_warnings) = scheme::sanitize(requested, params, grid.size_x, grid.size_y);
					warnings.extend(scheme_warnings);
					chosen
				},
				SchemeRequest::Auto => {
					let (chosen, scheme_warnings) = scheme::sanitize(scheme::auto(params), params, grid.size_x, grid.size_y);
					info!("Auto compress: {} selected", chosen);
					warnings.extend(scheme_warnings);
					chosen
				},
				SchemeRequest::Best => {
					let (chosen, scheme_warnings) = scheme::best(&image, &mapper, params);
					warnings.extend(scheme_warnings);
					chosen
				},
			};

			if params.title {
				sink.emitter().write_banner(&banner(params, Some(chosen)));
			}
			export_bitmap(&image, &mapper, params, chosen, sink.emitter())?
		},
	};

	warnings.append(&mut report.warnings);
	report.warnings = warnings;

	let mut bytes: Vec<u8> = sink.into_output();
	if params.bload && params.output_format == OutputFormat::Bin {
		let mut framed: Vec<u8> = bin_header::bload_header(params.start_address, bytes.len())?.to_vec();
		framed.append(&mut bytes);
		bytes = framed;
	}

	Ok(ExportOutcome {
		bytes,
		report,
	})
}


/// Comment lines opening a text output.
pub fn banner(params: &ExportParameters, scheme: Option<Scheme>) -> Vec<String> {
	let grid: &GridParams = &params.grid;
	let transparent: String = match params.key {
		ColorKey::None => String::from("none"),
		ColorKey::Transparent(color) => format!("#{:06X}", color & 0xFFFFFF),
		ColorKey::Opaque(color) => format!("all but #{:06X}", color & 0xFFFFFF),
	};

	let mut lines: Vec<String> = vec![
		format!("Data table generated by img2msx (v{})", VERSION),
		format!("- Input file:     {}", params.input_path.display()),
		format!("- Start position: {}, {}", grid.pos_x, grid.pos_y),
		format!("- Block size:     {}, {} (gap: {}, {})", grid.size_x, grid.size_y, grid.gap_x, grid.gap_y),
		format!("- Block count:    {}, {}", grid.num_x, grid.num_y),
		format!("- Color count:    {} (Transparent: {})", params.depth.color_count(), transparent),
		format!("- Compressor:     {}", scheme.map_or("GM2 tiles", Scheme::description)),
		format!("- Skip empty:     {}", if params.skip_empty { "TRUE" } else { "FALSE" }),
	];

	if let Some(copyright) = &params.copyright {
		lines.push(String::new());
		lines.extend(copyright.lines().map(str::to_string));
	}

	lines
}


/// Header, data, index and palette tables of a block grid export.
pub fn export_bitmap(image: &SourceImage, mapper: &ColorMapper, params: &ExportParameters, scheme: Scheme, out: &mut dyn TableEmitter) -> Result<ExportReport, ExportError> {
	let start: u32 = out.total_bytes();
	let grid: GridParams = params.grid.effective(image.width, image.height);
	let rects: Vec<BlockRect> = block_scan::blocks(&params.grid, image.width, image.height);
	block_scan::check_bounds(&rects, image.width, image.height)?;

	let mut report: ExportReport = ExportReport {
		scheme: Some(scheme),
		block_count: rects.len(),
		..ExportReport::default()
	};

	if params.add_header {
		BinHeader::new(grid.size_x, grid.size_y, grid.num_x, grid.num_y, params.depth, scheme, params.skip_empty)
			.write(&params.table_name, out);
	}

	// Data
	let data_start: u32 = out.total_bytes();
	let skip: bool = params.skip_empty && params.key.is_active();
	let mut index: Vec<u16> = Vec::with_capacity(rects.len());
	let mut wrapped: bool = false;

	out.begin_table(TableKind::U8, &params.table_name, "Data table");

	if let Some(font) = params.font {
		out.write_bytes(&[bit_depth::pack_fields(8, 4, grid.size_y as u8, 4)?], "Data size [x:4|y:4]");
		out.write_bytes(&[bit_depth::pack_fields(font.width, 4, font.height, 4)?], "Font size [x:4|y:4]");
		out.write_bytes(&[font.first], "First character");
		out.write_bytes(&[font.last], "Last character");
	}

	for rect in &rects {
		let block: BlockPixels = BlockPixels::capture(image, rect, mapper);

		if skip && block.is_empty() {
			index.push(NO_ENTRY);
			report.skipped += 1;
			continue;
		}

		let offset: u32 = out.total_bytes() - data_start;
		if params.add_index && offset > u16::MAX as u32 && !wrapped {
			report.warnings.push(Warning::IndexOffsetOverflow { block: rect.index, offset });
			wrapped = true;
		}
		index.push((offset as u16).wrapping_add(params.start_address));

		out.write_block_header(rect.index);
		block_compress::encode_block(&block, scheme, params.depth, out)?;
	}

	report.data_bytes = out.total_bytes() - data_start;
	out.end_table(&format!("Total size : {} bytes", report.data_bytes));

	// Index
	if params.add_index {
		out.begin_table(TableKind::U16, &format!("{}_index", params.table_name), "Index table");
		for (number, value) in index.iter().enumerate() {
			let comment: String = if *value == NO_ENTRY { format!("Block[{}] empty", number) } else { format!("Block[{}]", number) };
			out.write_words(&[*value], &comment);
		}
		out.end_table("");
	}

	if params.depth.is_indexed() && params.palette.kind == PaletteKind::Custom {
		write_palette(&mapper.palette, params, out);
	}

	report.total_bytes = out.total_bytes() - start;
	debug!("{}: {} blocks, {} skipped, {} bytes", scheme.short_name(), report.block_count, report.skipped, report.total_bytes);

	Ok(report)
}


/// Name, pattern and color tables of a tile export.
pub fn export_tiles(image: &SourceImage, mapper: &ColorMapper, params: &ExportParameters, out: &mut dyn TableEmitter) -> Result<ExportReport, ExportError> {
	let start: u32 = out.total_bytes();
	let tiles: TileSet = tile_gm2::build(image, mapper)?;

	info!("{} cells, {} unique chunks", tiles.names.len(), tiles.chunks.len());

	let mut warnings: Vec<Warning> = tiles.warnings.clone();
	warnings.extend(tile_gm2::emit(&tiles, &params.table_name, params.name_offset, out));

	if params.palette.kind == PaletteKind::Custom {
		write_palette(&mapper.palette, params, out);
	}

	let total_bytes: u32 = out.total_bytes() - start;
	Ok(ExportReport {
		scheme: None,
		block_count: tiles.names.len(),
		skipped: 0,
		data_bytes: total_bytes,
		total_bytes,
		warnings,
	})
}


/// Active palette entries, platform format or plain 24-bit.
pub fn write_palette(palette: &Palette, params: &ExportParameters, out: &mut dyn TableEmitter) {
	out.begin_table(TableKind::U8, &format!("{}_palette", params.table_name), "Custom palette");

	for (index, rgb) in palette.active() {
		let comment: String = format!("[{:2}] #{:06X}", index, rgb);

		if params.palette.pal24 {
			out.write_comment_line(&comment);
			out.begin_line();
			out.write_raw_byte((rgb >> 16) as u8);
			out.write_raw_byte((rgb >> 8) as u8);
			out.write_raw_byte(rgb as u8);
			out.end_line();
		}
		else {
			out.write_bytes(&palette::platform_bytes(rgb), &comment);
		}
	}

	out.end_table("");
}


/// Writes `bytes` next to `path` first, then moves the file into place, so
/// a failed run never leaves a truncated output behind.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
	let mut temp_name: OsString = path.as_os_str().to_owned();
	temp_name.push(".tmp");
	let temp_path: PathBuf = PathBuf::from(temp_name);

	let written: Result<(), ExportError> = (|| {
		let mut buffer: BufWriter<File> = BufWriter::new(File::create(&temp_path)?);
		buffer.write_all(bytes)?;
		buffer.flush()?;
		Ok(())
	})();

	if let Err(error) = written {
		let _ = fs::remove_file(&temp_path);
		return Err(error);
	}

	fs::rename(&temp_path, path)?;
	Ok(())
}
