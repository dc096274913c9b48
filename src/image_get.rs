use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use bmp_rust::bmp::{BMP, BITMAPFILEHEADER, DIBHEADER};
use log::debug;

use crate::{
	bit_depth,
	error::ExportError,
	shared_types::{Depth, SourceImage},
};

const BITMAPCOREHEADER_SIZE: usize = 12;
const FILE_HEADER_SIZE: usize = 14;
const BMP_COLOR_24: usize = 3;
const BMP_COLOR_32: usize = 4;


/// Decodes `path` into top-down `0xRRGGBB` pixels, alpha dropped. PNG and
/// BMP have their own readers, anything else goes through `image`.
pub fn load(path: &Path) -> Result<SourceImage, ExportError> {
	let extension: String = path.extension()
		.and_then(|e| e.to_str())
		.unwrap_or("")
		.to_lowercase();

	let image: SourceImage = match extension.as_str() {
		"png" => get_png(path)?,
		"bmp" => get_bmp(path)?,
		_ => get_other(path)?,
	};

	debug!("Loaded '{}': {}x{}", path.display(), image.width, image.height);
	Ok(image)
}


pub fn get_png(path: &Path) -> Result<SourceImage, ExportError> {
	let file: File = File::open(path)?;
	let mut decoder = png::Decoder::new(BufReader::new(file));

	// Palette, low bit depths and 16-bit channels all come out as 8-bit
	decoder.set_transformations(png::Transformations::normalize_to_color8());
	let mut reader = decoder.read_info()?;

	let mut buffer: Vec<u8> = vec![0; reader.output_buffer_size()];
	let frame: png::OutputInfo = reader.next_frame(&mut buffer)?;

	let channels: usize = match frame.color_type {
		png::ColorType::Grayscale => 1,
		png::ColorType::GrayscaleAlpha => 2,
		png::ColorType::Rgb => 3,
		png::ColorType::Rgba => 4,
		png::ColorType::Indexed => return Err(ExportError::PngLayout(path.to_path_buf())),
	};

	let mut pixels: Vec<u32> = Vec::with_capacity((frame.width * frame.height) as usize);

	for row in buffer[..frame.buffer_size()].chunks(frame.line_size) {
		for pixel in row.chunks_exact(channels).take(frame.width as usize) {
			let rgb: u32 = match channels {
				1 | 2 => (pixel[0] as u32) * 0x010101,
				_ => (pixel[0] as u32) << 16 | (pixel[1] as u32) << 8 | pixel[2] as u32,
			};
			pixels.push(rgb);
		}
	}

	Ok(SourceImage {
		width: frame.width,
		height: frame.height,
		pixels,
	})
}


pub fn get_bmp(path: &Path) -> Result<SourceImage, ExportError> {
	let bad = |reason: &str| ExportError::Bmp {
		path: path.to_path_buf(),
		reason: reason.to_string(),
	};

	// Not using BMP::new_from_file, it panics on unreadable files
	let bytes: Vec<u8> = fs::read(path)?;
	if bytes.len() < FILE_HEADER_SIZE + BITMAPCOREHEADER_SIZE {
		return Err(bad("file too short"));
	}

	let mut bmp: BMP = BMP::new(1i32, 1u32, Some([0u8, 0u8, 0u8, 0u8]));
	bmp.contents = bytes;

	let file_header: BITMAPFILEHEADER = BMP::get_header(&bmp);
	let dib_header: DIBHEADER = BMP::get_dib_header(&bmp).map_err(|_| bad("unreadable DIB header"))?;

	let width: usize = dib_header.width as usize;
	let height: usize = dib_header.height.unsigned_abs() as usize;
	let bottom_up: bool = dib_header.height > 0;
	let bitcount: usize = dib_header.bitcount as usize;

	let row_size: usize = ((bitcount * width + 31) / 32) * 4;
	let start: usize = file_header.bfOffBits as usize;

	if start + row_size * height > bmp.contents.len() {
		return Err(bad("pixel array past end of file"));
	}

	let palette: Vec<u32> = match bitcount {
		1 | 4 | 8 => bmp_palette(&bmp, &dib_header, bitcount).ok_or_else(|| bad("color table past end of file"))?,
		24 | 32 => Vec::new(),
		_ => return Err(bad(&format!("unsupported color depth ({})", bitcount))),
	};

	let mut pixels: Vec<u32> = Vec::with_capacity(width * height);

	for y in 0..height {
		let stored_row: usize = if bottom_up { height - 1 - y } else { y };
		let row: &[u8] = &bmp.contents[start + stored_row * row_size..start + (stored_row + 1) * row_size];

		match bitcount {
			24 | 32 => {
				let step: usize = bitcount / 8;
				for pixel in row.chunks_exact(step).take(width) {
					pixels.push((pixel[2] as u32) << 16 | (pixel[1] as u32) << 8 | pixel[0] as u32);
				}
			},

			_ => {
				let depth: Depth = match bitcount {
					1 => Depth::One,
					4 => Depth::Four,
					_ => Depth::Eight,
				};
				for index in bit_depth::unpack_codes(row, depth, width)? {
					pixels.push(palette.get(index as usize).copied().unwrap_or(0));
				}
			},
		}
	}

	Ok(SourceImage {
		width: width as u32,
		height: height as u32,
		pixels,
	})
}


/// BGR(A) color table following the DIB header.
fn bmp_palette(bmp: &BMP, dib_header: &DIBHEADER, bitcount: usize) -> Option<Vec<u32>> {
	let flags_offset: usize = match dib_header.compression.as_deref() {
		Some("BI_BITFIELDS") => 12,
		Some("BI_ALPHABITFIELDS") => 16,
		_ => 0,
	};

	let index: usize = FILE_HEADER_SIZE + dib_header.size as usize + flags_offset;
	let color_size: usize = if dib_header.size as usize == BITMAPCOREHEADER_SIZE { BMP_COLOR_24 } else { BMP_COLOR_32 };

	let color_count: usize = match dib_header.ClrUsed {
		Some(0) | None => 1 << bitcount,
		Some(value) => value as usize,
	};

	let table: &[u8] = bmp.contents.get(index..index + color_count * color_size)?;

	Some(table.chunks_exact(color_size)
		.map(|c| (c[2] as u32) << 16 | (c[1] as u32) << 8 | c[0] as u32)
		.collect())
}


pub fn get_other(path: &Path) -> Result<SourceImage, ExportError> {
	let rgb: image::RgbImage = image::open(path)?.to_rgb8();

	Ok(SourceImage {
		width: rgb.width(),
		height: rgb.height(),
		pixels: rgb.pixels()
			.map(|p| (p[0] as u32) << 16 | (p[1] as u32) << 8 | p[2] as u32)
			.collect(),
	})
}
