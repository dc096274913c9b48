use std::collections::HashMap;

use log::info;

use crate::{
	color::{ColorMapper, Rgb24},
	emitter::{TableEmitter, TableKind},
	error::{ExportError, Warning},
	shared_types::SourceImage,
};

pub const CELL_SIZE: u32 = 8;


/// One 8x8 cell reduced to two colors per line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Chunk {
	/// Bit 7 is the leftmost pixel; a set bit selects the high color.
	pub patterns: [u8; 8],
	/// `[high:4|low:4]` per line.
	pub colors: [u8; 8],
}

impl Chunk {
	/// Puts the larger color index in the high nibble of every line, and
	/// clears the pattern of single-color lines.
	pub fn canonicalize(&mut self) {
		for line in 0..8 {
			let high: u8 = self.colors[line] >> 4;
			let low: u8 = self.colors[line] & 0x0F;

			if high < low {
				self.colors[line] = (low << 4) | high;
				self.patterns[line] = !self.patterns[line];
			}
			else if high == low {
				self.patterns[line] = 0;
			}
		}
	}

	pub fn is_canonical(&self) -> bool {
		self.colors.iter().all(|c| c >> 4 >= c & 0x0F)
	}
}


/// Name grid plus the unique chunks it refers to.
#[derive(Clone, Debug, Default)]
pub struct TileSet {
	pub columns: u32,
	pub rows: u32,
	pub names: Vec<usize>,
	pub chunks: Vec<Chunk>,
	pub warnings: Vec<Warning>,
}


/// Splits the image into cells, left to right then top to bottom, and
/// stores each distinct chunk once. Pixels right or below the last full
/// cell are ignored.
pub fn build(image: &SourceImage, mapper: &ColorMapper) -> Result<TileSet, ExportError> {
	let columns: u32 = image.width / CELL_SIZE;
	let rows: u32 = image.height / CELL_SIZE;

	if columns == 0 || rows == 0 {
		return Err(ExportError::TooSmallForTiles(image.width, image.height));
	}

	let mut tiles: TileSet = TileSet {
		columns,
		rows,
		..TileSet::default()
	};
	let mut known: HashMap<Chunk, usize> = HashMap::new();

	for row in 0..rows {
		for column in 0..columns {
			let mut chunk: Chunk = reduce_cell(image, mapper, column, row, &mut tiles.warnings);
			chunk.canonicalize();

			let name: usize = *known.entry(chunk).or_insert_with(|| {
				tiles.chunks.push(chunk);
				tiles.chunks.len() - 1
			});
			tiles.names.push(name);
		}
	}

	Ok(tiles)
}


fn reduce_cell(image: &SourceImage, mapper: &ColorMapper, column: u32, row: u32, warnings: &mut Vec<Warning>) -> Chunk {
	let mut chunk: Chunk = Chunk {
		patterns: [0; 8],
		colors: [0; 8],
	};

	for line in 0..CELL_SIZE {
		let y: u32 = row * CELL_SIZE + line;
		let mut slots: Vec<u8> = Vec::with_capacity(2);
		let mut pattern: u8 = 0;
		let mut overflow: bool = false;

		for bit in 0..CELL_SIZE {
			let code: u8 = mapper.map(image.pixel(column * CELL_SIZE + bit, y));

			let slot: usize = match slots.iter().position(|&s| s == code) {
				Some(slot) => slot,
				None if slots.len() < 2 => {
					slots.push(code);
					slots.len() - 1
				},
				None => {
					overflow = true;
					nearest_slot(mapper, &slots, code)
				},
			};

			if slot == 1 {
				pattern |= 0x80 >> bit;
			}
		}

		if overflow {
			warnings.push(Warning::TileRowOverflow { column, row, line });
		}

		let low: u8 = slots[0];
		let high: u8 = *slots.get(1).unwrap_or(&low);
		chunk.patterns[line as usize] = pattern;
		chunk.colors[line as usize] = (high << 4) | (low & 0x0F);
	}

	chunk
}


/// Slot whose palette color is closest to `code`'s; ties go to slot 0.
fn nearest_slot(mapper: &ColorMapper, slots: &[u8], code: u8) -> usize {
	let color: Rgb24 = Rgb24::from_u32(mapper.palette.rgb(code));
	let first: u32 = color.distance(Rgb24::from_u32(mapper.palette.rgb(slots[0])));
	let second: u32 = color.distance(Rgb24::from_u32(mapper.palette.rgb(slots[1])));

	if second < first { 1 } else { 0 }
}


/// Writes the name, pattern and color tables. Names wider than a byte are
/// written as words.
pub fn emit(tiles: &TileSet, name: &str, name_offset: u8, out: &mut dyn TableEmitter) -> Vec<Warning> {
	let mut warnings: Vec<Warning> = Vec::new();
	let wide: bool = tiles.chunks.len() + name_offset as usize > 256;

	if wide {
		warnings.push(Warning::WideNames(tiles.chunks.len()));
	}

	// Names
	let start: u32 = out.total_bytes();
	let kind: TableKind = if wide { TableKind::U16 } else { TableKind::U8 };
	out.begin_table(kind, &format!("{}_names", name), &format!("Names table ({}x{})", tiles.columns, tiles.rows));

	for (row, names) in tiles.names.chunks(tiles.columns as usize).enumerate() {
		if wide {
			for (column, &value) in names.iter().enumerate() {
				out.write_words(&[(value + name_offset as usize) as u16], &format!("Cell {},{}", column, row));
			}
		}
		else {
			out.begin_line();
			for &value in names {
				out.write_raw_byte((value + name_offset as usize) as u8);
			}
			out.end_line();
		}
	}

	out.end_table(&format!("Names size: {} bytes", out.total_bytes() - start));
	info!("Names table: {} bytes", out.total_bytes() - start);

	// Patterns
	let start: u32 = out.total_bytes();
	out.begin_table(TableKind::U8, &format!("{}_patterns", name), &format!("Patterns table ({} chunks)", tiles.chunks.len()));

	for (index, chunk) in tiles.chunks.iter().enumerate() {
		out.write_comment_line(&format!("Chunk[{}]", index));
		out.begin_line();
		for &pattern in &chunk.patterns {
			out.write_bits_byte(pattern);
		}
		out.end_line();
	}

	out.end_table(&format!("Patterns size: {} bytes", out.total_bytes() - start));
	info!("Patterns table: {} bytes", out.total_bytes() - start);

	// Colors
	let start: u32 = out.total_bytes();
	out.begin_table(TableKind::U8, &format!("{}_colors", name), &format!("Colors table ({} chunks)", tiles.chunks.len()));

	for (index, chunk) in tiles.chunks.iter().enumerate() {
		out.write_comment_line(&format!("Chunk[{}]", index));
		out.begin_line();
		for &colors in &chunk.colors {
			out.write_raw_byte(colors);
		}
		out.end_line();
	}

	out.end_table(&format!("Colors size: {} bytes", out.total_bytes() - start));
	info!("Colors table: {} bytes", out.total_bytes() - start);

	warnings
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::emitter::{BinarySink, CountingSink};
	use crate::palette::Palette;
	use crate::shared_types::{ColorKey, Depth};

	fn mapper() -> ColorMapper {
		ColorMapper::new(Depth::Four, Palette::reference(Depth::Four), ColorKey::None)
	}

	fn image(width: u32, height: u32, fill: u32) -> SourceImage {
		SourceImage {
			width,
			height,
			pixels: vec![fill; (width * height) as usize],
		}
	}

	#[test]
	fn solid_cell_has_empty_pattern() {
		let tiles: TileSet = build(&image(8, 8, 0x3EB849), &mapper()).unwrap();

		assert_eq!(tiles.chunks.len(), 1);
		assert_eq!(tiles.chunks[0].patterns, [0; 8]);
		assert_eq!(tiles.chunks[0].colors, [0x22; 8]);
		assert!(tiles.warnings.is_empty());
	}

	#[test]
	fn cells_are_stored_canonical() {
		// Left cell: white then black halves. Right cell: black then white.
		let mut source: SourceImage = image(16, 8, 0x000000);
		for y in 0..8 {
			for x in 0..4 {
				source.pixels[y * 16 + x] = 0xFFFFFF;
			}
			for x in 12..16 {
				source.pixels[y * 16 + x] = 0xFFFFFF;
			}
		}
		let tiles: TileSet = build(&source, &mapper()).unwrap();

		assert_eq!(tiles.chunks.len(), 2);
		assert!(tiles.chunks.iter().all(Chunk::is_canonical));
		// White is index 15, black index 1
		assert_eq!(tiles.chunks[0].colors, [0xF1; 8]);
		assert_eq!(tiles.chunks[0].patterns, [0xF0; 8]);
		assert_eq!(tiles.chunks[1].colors, [0xF1; 8]);
		assert_eq!(tiles.chunks[1].patterns, [0x0F; 8]);
	}

	#[test]
	fn identical_cells_share_a_chunk() {
		let mut source: SourceImage = image(24, 8, 0xFFFFFF);
		for cell in [0usize, 2] {
			source.pixels[3 * 24 + cell * 8 + 5] = 0x000000;
		}
		let tiles: TileSet = build(&source, &mapper()).unwrap();

		assert_eq!(tiles.names, vec![0, 1, 0]);
		assert_eq!(tiles.chunks.len(), 2);
	}

	#[test]
	fn canonical_form_swaps_and_clears() {
		let mut chunk: Chunk = Chunk {
			patterns: [0x0F, 0x55, 0x81, 0, 0, 0, 0, 0],
			colors: [0x1F, 0x33, 0xF1, 0, 0, 0, 0, 0],
		};
		chunk.canonicalize();

		assert_eq!(chunk.patterns[..3], [0xF0, 0x00, 0x81]);
		assert_eq!(chunk.colors[..3], [0xF1, 0x33, 0xF1]);
		assert!(chunk.is_canonical());
	}

	#[test]
	fn third_color_goes_to_nearest_slot() {
		let mut source: SourceImage = image(8, 8, 0x000000);
		source.pixels[1] = 0xFFFFFF;
		source.pixels[2] = 0xC0C0C0;
		let tiles: TileSet = build(&source, &mapper()).unwrap();

		assert_eq!(tiles.warnings, vec![Warning::TileRowOverflow { column: 0, row: 0, line: 0 }]);
		// 0xC0C0C0 maps to gray (14), approximated as white
		assert_eq!(tiles.chunks[0].patterns[0], 0b0110_0000);
		assert_eq!(tiles.chunks[0].colors[0], 0xF1);
	}

	#[test]
	fn tables_follow_each_other() {
		let tiles: TileSet = build(&image(24, 16, 0xFFFFFF), &mapper()).unwrap();
		let mut sink: BinarySink = BinarySink::default();
		let warnings: Vec<Warning> = emit(&tiles, "g_Tiles", 4, &mut sink);

		assert!(warnings.is_empty());
		assert_eq!(&sink.bytes()[..6], &[4; 6]);
		assert_eq!(sink.bytes().len(), 6 + 8 + 8);
	}

	#[test]
	fn wide_names_use_words() {
		// 300 distinct cells: black line of varying position and color
		let mut source: SourceImage = image(8 * 300, 8, 0xFFFFFF);
		for cell in 0..300usize {
			let line: usize = cell % 8;
			let pattern: usize = cell / 8 + 1;
			for bit in 0..8 {
				if pattern & (1 << bit) != 0 {
					source.pixels[line * 8 * 300 + cell * 8 + bit] = 0x000000;
				}
			}
		}
		let tiles: TileSet = build(&source, &mapper()).unwrap();
		assert_eq!(tiles.chunks.len(), 300);

		let mut counting: CountingSink = CountingSink::default();
		let warnings: Vec<Warning> = emit(&tiles, "g_Wide", 0, &mut counting);
		assert_eq!(warnings, vec![Warning::WideNames(300)]);
		assert_eq!(counting.total_bytes(), 300 * 2 + 300 * 16);
	}

	#[test]
	fn tiny_image_is_rejected() {
		assert!(matches!(build(&image(7, 16, 0), &mapper()), Err(ExportError::TooSmallForTiles(7, 16))));
	}
}
