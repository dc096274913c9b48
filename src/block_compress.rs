use crate::{
	block_scan::BlockRect,
	bit_depth,
	color::ColorMapper,
	emitter::TableEmitter,
	error::ExportError,
	shared_types::{CropClass, Depth, RleKind, Scheme, SourceImage},
};

// Runs of RLE4 / RLE8 tokens per text line
const RUNS_PER_LINE: usize = 16;


/// Mapped codes of one block, row-major, with the transparency of every
/// source pixel kept alongside.
#[derive(Clone, Debug)]
pub struct BlockPixels {
	pub width: u32,
	pub height: u32,
	pub codes: Vec<u8>,
	pub transparent: Vec<bool>,
}

impl BlockPixels {
	pub fn capture(image: &SourceImage, rect: &BlockRect, mapper: &ColorMapper) -> BlockPixels {
		let pixel_count: usize = (rect.width * rect.height) as usize;
		let mut codes: Vec<u8> = Vec::with_capacity(pixel_count);
		let mut transparent: Vec<bool> = Vec::with_capacity(pixel_count);

		for y in rect.y..rect.y + rect.height {
			for x in rect.x..rect.x + rect.width {
				let rgb: u32 = image.pixel(x, y);
				codes.push(mapper.map(rgb));
				transparent.push(mapper.is_transparent(rgb));
			}
		}

		BlockPixels {
			width: rect.width,
			height: rect.height,
			codes,
			transparent,
		}
	}

	/// True when no pixel is visible.
	pub fn is_empty(&self) -> bool {
		self.transparent.iter().all(|&t| t)
	}

	fn visible(&self, x: u32, y: u32) -> bool {
		!self.transparent[(y * self.width + x) as usize]
	}

	/// Code at `x`, or 0 for padding past the right edge.
	fn code(&self, x: u32, y: u32) -> u8 {
		if x >= self.width {
			return 0;
		}
		self.codes[(y * self.width + x) as usize]
	}
}


/// Inclusive box around the visible pixels of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
	pub min_x: u32,
	pub max_x: u32,
	pub min_y: u32,
	pub max_y: u32,
}

impl BoundingBox {
	pub const EMPTY: BoundingBox = BoundingBox { min_x: 0, max_x: 0, min_y: 0, max_y: 0 };
}


pub fn bounding_box(block: &BlockPixels) -> Option<BoundingBox> {
	let mut found: Option<BoundingBox> = None;

	for y in 0..block.height {
		if let Some((min_x, max_x)) = line_extent(block, y) {
			found = Some(match found {
				None => BoundingBox { min_x, max_x, min_y: y, max_y: y },
				Some(b) => BoundingBox {
					min_x: b.min_x.min(min_x),
					max_x: b.max_x.max(max_x),
					min_y: b.min_y,
					max_y: y,
				},
			});
		}
	}

	found
}


/// First and last visible column of line `y`.
pub fn line_extent(block: &BlockPixels, y: u32) -> Option<(u32, u32)> {
	let min_x: u32 = (0..block.width).find(|&x| block.visible(x, y))?;
	let max_x: u32 = (0..block.width).rev().find(|&x| block.visible(x, y))?;
	Some((min_x, max_x))
}


/// Widens `[min, max]` so both ends fall on byte boundaries at `depth`.
fn align_span(min: u32, max: u32, depth: Depth) -> (u32, u32) {
	let ppb: u32 = depth.pixels_per_byte();
	(min - min % ppb, max - max % ppb + ppb - 1)
}


/// Horizontal span as stored by `class`. Crop32 keeps only 3 bits for the
/// minimum, so a larger one is pulled back to 7 (then realigned).
fn clamp_span_x(class: CropClass, min: u32, max: u32, depth: Depth) -> (u32, u32) {
	let (mut min, max) = align_span(min, max, depth);

	if class == CropClass::C32 && min > 7 {
		let (capped, _) = align_span(7, 7, depth);
		min = capped;
	}

	(min, max)
}

fn clamp_span_y(class: CropClass, min: u32, max: u32) -> (u32, u32) {
	if class == CropClass::C32 {
		return (min.min(7), max);
	}
	(min, max)
}


/// Header bytes of one `[min, max]` span.
fn span_bytes(class: CropClass, min: u32, max: u32) -> Result<Vec<u8>, ExportError> {
	Ok(match class {
		CropClass::C16 => vec![bit_depth::pack_fields(min as u8, 4, max as u8, 4)?],
		CropClass::C32 => vec![bit_depth::pack_fields(min as u8, 3, max as u8, 5)?],
		CropClass::C256 => vec![min as u8, max as u8],
	})
}

/// Header of a line without visible pixel; min is written above max.
fn empty_line_bytes(class: CropClass) -> Result<Vec<u8>, ExportError> {
	Ok(match class {
		CropClass::C16 => vec![bit_depth::pack_fields(15, 4, 0, 4)?],
		CropClass::C32 => vec![bit_depth::pack_fields(7, 3, 0, 5)?],
		CropClass::C256 => vec![255, 0],
	})
}


fn write_row(block: &BlockPixels, y: u32, min_x: u32, max_x: u32, depth: Depth, out: &mut dyn TableEmitter) -> Result<(), ExportError> {
	let codes: Vec<u8> = (min_x..=max_x).map(|x| block.code(x, y)).collect();
	let packed: Vec<u8> = bit_depth::pack_codes(&codes, depth)?;

	out.begin_line();
	for byte in packed {
		if depth == Depth::One {
			out.write_bits_byte(byte);
		}
		else {
			out.write_raw_byte(byte);
		}
	}
	out.end_line();

	Ok(())
}


/// Encodes one block with `scheme`. Compatibility is the caller's concern.
pub fn encode_block(block: &BlockPixels, scheme: Scheme, depth: Depth, out: &mut dyn TableEmitter) -> Result<(), ExportError> {
	match scheme {
		Scheme::None => encode_plain(block, depth, out),
		Scheme::Crop(class) => encode_crop(block, class, depth, out),
		Scheme::CropLine(class) => encode_crop_line(block, class, depth, out),
		Scheme::Rle(kind) => encode_rle(block, kind, depth, out),
	}
}


fn encode_plain(block: &BlockPixels, depth: Depth, out: &mut dyn TableEmitter) -> Result<(), ExportError> {
	if block.width == 0 {
		return Ok(());
	}

	let (_, max_x) = align_span(0, block.width - 1, depth);
	for y in 0..block.height {
		write_row(block, y, 0, max_x, depth, out)?;
	}

	Ok(())
}


fn encode_crop(block: &BlockPixels, class: CropClass, depth: Depth, out: &mut dyn TableEmitter) -> Result<(), ExportError> {
	let bbox: BoundingBox = bounding_box(block).unwrap_or(BoundingBox::EMPTY);
	let (min_x, max_x) = clamp_span_x(class, bbox.min_x, bbox.max_x, depth);
	let (min_y, max_y) = clamp_span_y(class, bbox.min_y, bbox.max_y);

	let mut header: Vec<u8> = span_bytes(class, min_x, max_x)?;
	header.extend(span_bytes(class, min_y, max_y)?);

	let comment: String = format!("minX:{} maxX:{} minY:{} maxY:{}", min_x, max_x, min_y, max_y);
	out.write_bytes(&header, &comment);

	for y in min_y..=max_y {
		write_row(block, y, min_x, max_x, depth, out)?;
	}

	Ok(())
}


fn encode_crop_line(block: &BlockPixels, class: CropClass, depth: Depth, out: &mut dyn TableEmitter) -> Result<(), ExportError> {
	let bbox: BoundingBox = bounding_box(block).unwrap_or(BoundingBox::EMPTY);
	let (min_y, max_y) = clamp_span_y(class, bbox.min_y, bbox.max_y);

	let header: Vec<u8> = span_bytes(class, min_y, max_y)?;
	out.write_bytes(&header, &format!("minY:{} maxY:{}", min_y, max_y));

	for y in min_y..=max_y {
		match line_extent(block, y) {
			Some((min_x, max_x)) => {
				let (min_x, max_x) = clamp_span_x(class, min_x, max_x, depth);
				out.write_bytes(&span_bytes(class, min_x, max_x)?, &format!("Line {} minX:{} maxX:{}", y, min_x, max_x));
				write_row(block, y, min_x, max_x, depth, out)?;
			},
			None => {
				out.write_bytes(&empty_line_bytes(class)?, &format!("Line {} empty", y));
			},
		}
	}

	Ok(())
}


/// One unit of a run-length stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Run {
	/// Transparent pixels, RLE0 only.
	Transparent(usize),
	/// Visible pixels with their codes, RLE0 only.
	Opaque(Vec<u8>),
	/// Repeated code, RLE4 and RLE8.
	Color { code: u8, length: usize },
}

impl Run {
	pub fn length(&self) -> usize {
		match self {
			Run::Transparent(length) => *length,
			Run::Opaque(codes) => codes.len(),
			Run::Color { length, .. } => *length,
		}
	}
}


/// Splits the block, row-major, into runs no longer than `kind` allows.
pub fn build_runs(block: &BlockPixels, kind: RleKind) -> Vec<Run> {
	let max_length: usize = kind.max_length();
	let mut runs: Vec<Run> = Vec::new();

	match kind {
		RleKind::Rle0 => {
			for (index, &code) in block.codes.iter().enumerate() {
				let transparent: bool = block.transparent[index];

				match runs.last_mut() {
					Some(Run::Transparent(length)) if transparent && *length < max_length => *length += 1,
					Some(Run::Opaque(codes)) if !transparent && codes.len() < max_length => codes.push(code),
					_ => {
						if transparent {
							runs.push(Run::Transparent(1));
						}
						else {
							runs.push(Run::Opaque(vec![code]));
						}
					},
				}
			}
		},

		RleKind::Rle4 | RleKind::Rle8 => {
			for &code in &block.codes {
				match runs.last_mut() {
					Some(Run::Color { code: current, length }) if *current == code && *length < max_length => *length += 1,
					_ => runs.push(Run::Color { code, length: 1 }),
				}
			}
		},
	}

	runs
}


fn encode_rle(block: &BlockPixels, kind: RleKind, depth: Depth, out: &mut dyn TableEmitter) -> Result<(), ExportError> {
	let runs: Vec<Run> = build_runs(block, kind);

	match kind {
		RleKind::Rle0 => {
			for run in &runs {
				match run {
					Run::Transparent(length) => {
						out.write_bytes(&[0x80 | *length as u8], &format!("Transparent x{}", length));
					},
					Run::Opaque(codes) => {
						let packed: Vec<u8> = bit_depth::pack_codes(codes, depth)?;
						out.write_comment_line(&format!("Opaque x{}", codes.len()));
						out.begin_line();
						out.write_raw_byte(codes.len() as u8);
						for byte in packed {
							out.write_raw_byte(byte);
						}
						out.end_line();
					},
					Run::Color { .. } => {},
				}
			}
		},

		RleKind::Rle4 | RleKind::Rle8 => {
			for line in runs.chunks(RUNS_PER_LINE) {
				out.begin_line();
				for run in line {
					if let Run::Color { code, length } = run {
						if kind == RleKind::Rle4 {
							out.write_raw_byte(((*length as u8) << 4) | (code & 0x0F));
						}
						else {
							out.write_raw_byte(*length as u8);
							out.write_raw_byte(*code);
						}
					}
				}
				out.end_line();
			}
		},
	}

	Ok(())
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::emitter::{BinarySink, CountingSink};
	use crate::palette::Palette;
	use crate::shared_types::ColorKey;

	const KEY: u32 = 0xFF00FF;

	fn block_from(width: u32, height: u32, pixels: Vec<u32>, depth: Depth, key: ColorKey) -> BlockPixels {
		let image: SourceImage = SourceImage { width, height, pixels };
		let rect: BlockRect = BlockRect { index: 0, x: 0, y: 0, width, height };
		let mapper: ColorMapper = ColorMapper::new(depth, Palette::reference(depth), key);
		BlockPixels::capture(&image, &rect, &mapper)
	}

	/// A 16x16 sprite: transparent border, white square with a red stripe.
	fn sprite_pixels() -> Vec<u32> {
		let mut pixels: Vec<u32> = vec![KEY; 256];
		for y in 3..12 {
			for x in 5..14 {
				pixels[y * 16 + x] = if y == 7 { 0xFF0000 } else { 0xFFFFFF };
			}
		}
		pixels[15 * 16 + 2] = 0x00FF00;
		pixels
	}

	fn encode(block: &BlockPixels, scheme: Scheme, depth: Depth) -> Vec<u8> {
		let mut sink: BinarySink = BinarySink::default();
		encode_block(block, scheme, depth, &mut sink).unwrap();
		sink.bytes().to_vec()
	}

	fn decode_rle(bytes: &[u8], kind: RleKind, depth: Depth) -> Vec<u8> {
		let mut codes: Vec<u8> = Vec::new();
		let mut pos: usize = 0;

		while pos < bytes.len() {
			match kind {
				RleKind::Rle0 => {
					let token: u8 = bytes[pos];
					pos += 1;
					let length: usize = (token & 0x7F) as usize;
					if token & 0x80 != 0 {
						codes.extend(std::iter::repeat(0).take(length));
					}
					else {
						let size: usize = (length * depth.bits() as usize + 7) / 8;
						codes.extend(bit_depth::unpack_codes(&bytes[pos..pos + size], depth, length).unwrap());
						pos += size;
					}
				},
				RleKind::Rle4 => {
					codes.extend(std::iter::repeat(bytes[pos] & 0x0F).take((bytes[pos] >> 4) as usize));
					pos += 1;
				},
				RleKind::Rle8 => {
					codes.extend(std::iter::repeat(bytes[pos + 1]).take(bytes[pos] as usize));
					pos += 2;
				},
			}
		}

		codes
	}

	#[test]
	fn plain_one_bit_black_block() {
		let block: BlockPixels = block_from(8, 8, vec![0x000000; 64], Depth::One, ColorKey::None);
		assert_eq!(encode(&block, Scheme::None, Depth::One), vec![0x00; 8]);
	}

	#[test]
	fn rle_round_trips() {
		for depth in [Depth::Four, Depth::Eight] {
			let block: BlockPixels = block_from(16, 16, sprite_pixels(), depth, ColorKey::Transparent(KEY));
			for kind in [RleKind::Rle0, RleKind::Rle4, RleKind::Rle8] {
				if kind == RleKind::Rle4 && depth == Depth::Eight {
					continue;
				}
				let bytes: Vec<u8> = encode(&block, Scheme::Rle(kind), depth);
				assert_eq!(decode_rle(&bytes, kind, depth), block.codes, "{:?} at {:?}", kind, depth);
			}
		}
	}

	#[test]
	fn runs_respect_their_caps() {
		// 300 pixels of one color, then 300 transparent ones
		let mut pixels: Vec<u32> = vec![0xFFFFFF; 300];
		pixels.extend(vec![KEY; 300]);
		let block: BlockPixels = block_from(600, 1, pixels, Depth::Four, ColorKey::Transparent(KEY));

		for kind in [RleKind::Rle0, RleKind::Rle4, RleKind::Rle8] {
			let runs: Vec<Run> = build_runs(&block, kind);
			assert!(runs.iter().all(|r| r.length() >= 1 && r.length() <= kind.max_length()));
			assert_eq!(runs.iter().map(Run::length).sum::<usize>(), 600);
		}

		assert_eq!(build_runs(&block, RleKind::Rle8)[0], Run::Color { code: 15, length: 255 });
	}

	#[test]
	fn bounding_box_holds_every_visible_pixel() {
		let block: BlockPixels = block_from(16, 16, sprite_pixels(), Depth::Eight, ColorKey::Transparent(KEY));
		let bbox: BoundingBox = bounding_box(&block).unwrap();

		assert_eq!(bbox, BoundingBox { min_x: 2, max_x: 13, min_y: 3, max_y: 15 });
		for y in 0..16 {
			for x in 0..16 {
				if block.visible(x, y) {
					assert!(bbox.min_x <= x && x <= bbox.max_x && bbox.min_y <= y && y <= bbox.max_y);
				}
			}
		}
	}

	#[test]
	fn crop16_header_and_size() {
		let block: BlockPixels = block_from(16, 16, sprite_pixels(), Depth::Eight, ColorKey::Transparent(KEY));
		let bytes: Vec<u8> = encode(&block, Scheme::Crop(CropClass::C16), Depth::Eight);

		assert_eq!(&bytes[..2], &[0x2D, 0x3F]);
		assert_eq!(bytes.len(), 2 + 12 * 13);
	}

	#[test]
	fn crop_rounds_to_byte_boundaries() {
		let block: BlockPixels = block_from(16, 16, sprite_pixels(), Depth::One, ColorKey::Transparent(KEY));
		let bytes: Vec<u8> = encode(&block, Scheme::Crop(CropClass::C16), Depth::One);

		// minX 2 down to 0, maxX 13 up to 15
		assert_eq!(bytes[0], 0x0F);
		assert_eq!(bytes.len(), 2 + 2 * 13);
	}

	#[test]
	fn crop32_caps_the_minimum() {
		let mut pixels: Vec<u32> = vec![KEY; 32 * 32];
		pixels[20 * 32 + 20] = 0xFFFFFF;
		let block: BlockPixels = block_from(32, 32, pixels, Depth::Eight, ColorKey::Transparent(KEY));
		let bytes: Vec<u8> = encode(&block, Scheme::Crop(CropClass::C32), Depth::Eight);

		assert_eq!(bit_depth::unpack_fields(bytes[0], 3, 5).unwrap(), (7, 20));
		assert_eq!(bit_depth::unpack_fields(bytes[1], 3, 5).unwrap(), (7, 20));
		assert_eq!(bytes.len(), 2 + 14 * 14);
	}

	#[test]
	fn crop_line_marks_empty_lines() {
		let mut pixels: Vec<u32> = vec![KEY; 16 * 4];
		pixels[0 * 16 + 3] = 0xFFFFFF;
		pixels[3 * 16 + 5] = 0xFFFFFF;
		pixels[3 * 16 + 6] = 0xFFFFFF;
		let block: BlockPixels = block_from(16, 4, pixels, Depth::Eight, ColorKey::Transparent(KEY));
		let bytes: Vec<u8> = encode(&block, Scheme::CropLine(CropClass::C16), Depth::Eight);

		assert_eq!(bytes, vec![
			0x03,
			0x33, 0xFF,
			0xF0,
			0xF0,
			0x56, 0xFF, 0xFF,
		]);
	}

	#[test]
	fn empty_block_without_skip_is_one_pixel() {
		let block: BlockPixels = block_from(8, 8, vec![KEY; 64], Depth::Four, ColorKey::Transparent(KEY));
		assert!(block.is_empty());
		assert_eq!(encode(&block, Scheme::Crop(CropClass::C256), Depth::Four), vec![0, 1, 0, 0, 0x00]);
	}

	#[test]
	fn counting_matches_binary_output() {
		let block: BlockPixels = block_from(16, 16, sprite_pixels(), Depth::Four, ColorKey::Transparent(KEY));
		for scheme in Scheme::CANDIDATES {
			let mut counting: CountingSink = CountingSink::default();
			encode_block(&block, scheme, Depth::Four, &mut counting).unwrap();
			assert_eq!(counting.total_bytes() as usize, encode(&block, scheme, Depth::Four).len());
		}
	}
}
