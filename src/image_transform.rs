use crate::shared_types::{ColorKey, DitherMethod, SourceImage};


/// Colors a dithered pixel is set to, so that 1-bit mapping reads "on"
/// as 1 and "off" as 0.
pub fn dither_colors(key: ColorKey) -> (u32, u32) {
	match key {
		ColorKey::None => (0xFFFFFF, 0x000000),
		ColorKey::Transparent(color) => {
			let color: u32 = color & 0xFFFFFF;
			// A white key would swallow the "on" pixels
			let on: u32 = if color == 0xFFFFFF { 0x000000 } else { 0xFFFFFF };
			(on, color)
		},
		ColorKey::Opaque(color) => (color & 0xFFFFFF, (color & 0xFFFFFF) ^ 0xFFFFFF),
	}
}


fn luma(rgb: u32) -> f32 {
	let r: u32 = (rgb >> 16) & 0xFF;
	let g: u32 = (rgb >> 8) & 0xFF;
	let b: u32 = rgb & 0xFF;
	((299 * r + 587 * g + 114 * b) / 1000) as f32
}


/// Reduces the image to two colors. Transparent pixels take the off color
/// and never join the error diffusion.
pub fn dither(image: &SourceImage, method: DitherMethod, key: ColorKey) -> SourceImage {
	let (on, off) = dither_colors(key);
	let width: usize = image.width as usize;
	let height: usize = image.height as usize;
	let opaque: Vec<bool> = image.pixels.iter().map(|&p| !key.is_transparent(p)).collect();

	let lit: Vec<bool> = match method {
		DitherMethod::None => image.pixels.iter().map(|&p| luma(p) >= 128.0).collect(),
		DitherMethod::Floyd => floyd_steinberg(image, &opaque, width, height),
		DitherMethod::Bayer4 => ordered(image, &bayer_matrix(4), 4),
		DitherMethod::Bayer8 => ordered(image, &bayer_matrix(8), 8),
		DitherMethod::Bayer16 => ordered(image, &bayer_matrix(16), 16),
		DitherMethod::Cluster6 => ordered(image, &cluster_matrix(6), 6),
		DitherMethod::Cluster8 => ordered(image, &cluster_matrix(8), 8),
		DitherMethod::Cluster16 => ordered(image, &cluster_matrix(16), 16),
	};

	SourceImage {
		width: image.width,
		height: image.height,
		pixels: lit.into_iter()
			.zip(opaque)
			.map(|(lit, opaque)| if lit && opaque { on } else { off })
			.collect(),
	}
}


/// Error diffusion over a buffer padded by one column on each side and one
/// row below. Error spilled onto a masked pixel is dropped.
fn floyd_steinberg(image: &SourceImage, opaque: &[bool], width: usize, height: usize) -> Vec<bool> {
	let buf_width: usize = width + 2;
	let mut buf: Vec<Vec<f32>> = vec![vec![0.0; buf_width]; height + 1];

	for y in 0..height {
		for x in 0..width {
			buf[y][x + 1] = luma(image.pixels[y * width + x]);
		}
	}

	let mut lit: Vec<bool> = Vec::with_capacity(width * height);

	for y in 0..height {
		for x in 0..width {
			if !opaque[y * width + x] {
				lit.push(false);
				continue;
			}

			let bx: usize = x + 1;
			let old: f32 = buf[y][bx];
			let new: f32 = if old >= 128.0 { 255.0 } else { 0.0 };
			let err: f32 = old - new;
			lit.push(new > 0.0);

			//   * 7
			// 3 5 1
			buf[y][bx + 1] += err * (7.0 / 16.0);
			buf[y + 1][bx - 1] += err * (3.0 / 16.0);
			buf[y + 1][bx] += err * (5.0 / 16.0);
			buf[y + 1][bx + 1] += err * (1.0 / 16.0);
		}
	}

	lit
}


/// Dispersed-dot threshold ranks, `size` a power of two.
pub fn bayer_matrix(size: usize) -> Vec<usize> {
	let mut matrix: Vec<usize> = vec![0];
	let mut current: usize = 1;

	while current < size {
		let next: usize = current * 2;
		let mut grown: Vec<usize> = vec![0; next * next];

		for y in 0..current {
			for x in 0..current {
				let rank: usize = 4 * matrix[y * current + x];
				grown[y * next + x] = rank;
				grown[y * next + x + current] = rank + 2;
				grown[(y + current) * next + x] = rank + 3;
				grown[(y + current) * next + x + current] = rank + 1;
			}
		}

		matrix = grown;
		current = next;
	}

	matrix
}


/// Clustered-dot threshold ranks: cells closest to the center light first.
pub fn cluster_matrix(size: usize) -> Vec<usize> {
	let center: f32 = size as f32 / 2.0;
	let mut cells: Vec<(f32, usize)> = (0..size * size)
		.map(|i| {
			let dx: f32 = (i % size) as f32 + 0.5 - center;
			let dy: f32 = (i / size) as f32 + 0.5 - center;
			(dx * dx + dy * dy, i)
		})
		.collect();

	cells.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

	let mut matrix: Vec<usize> = vec![0; size * size];
	for (rank, (_, cell)) in cells.into_iter().enumerate() {
		matrix[cell] = rank;
	}
	matrix
}


fn ordered(image: &SourceImage, matrix: &[usize], size: usize) -> Vec<bool> {
	let levels: f32 = (size * size) as f32;
	let width: usize = image.width as usize;

	image.pixels.iter()
		.enumerate()
		.map(|(i, &rgb)| {
			let rank: usize = matrix[(i / width % size) * size + i % width % size];
			let threshold: f32 = (rank as f32 + 0.5) * 255.0 / levels;
			luma(rgb) >= threshold
		})
		.collect()
}


#[cfg(test)]
mod tests {
	use super::*;

	fn gray(width: u32, height: u32, level: u32) -> SourceImage {
		SourceImage {
			width,
			height,
			pixels: vec![level * 0x010101; (width * height) as usize],
		}
	}

	#[test]
	fn bayer_ranks_are_a_permutation() {
		assert_eq!(bayer_matrix(2), vec![0, 2, 3, 1]);
		for size in [4, 8, 16] {
			let mut ranks: Vec<usize> = bayer_matrix(size);
			ranks.sort();
			assert_eq!(ranks, (0..size * size).collect::<Vec<usize>>());
		}
	}

	#[test]
	fn cluster_starts_in_the_middle() {
		let matrix: Vec<usize> = cluster_matrix(6);
		let mut sorted: Vec<usize> = matrix.clone();
		sorted.sort();
		assert_eq!(sorted, (0..36).collect::<Vec<usize>>());
		assert!(matrix[2 * 6 + 2] < 4);
		assert!(matrix[0] >= 32);
	}

	#[test]
	fn half_gray_lights_half_the_pixels() {
		for method in [DitherMethod::Floyd, DitherMethod::Bayer4, DitherMethod::Bayer8, DitherMethod::Cluster8] {
			let out: SourceImage = dither(&gray(16, 16, 128), method, ColorKey::None);
			let lit: usize = out.pixels.iter().filter(|&&p| p == 0xFFFFFF).count();
			assert!((112..=144).contains(&lit), "{:?} lit {}", method, lit);
		}
	}

	#[test]
	fn extremes_stay_flat() {
		for method in [DitherMethod::Floyd, DitherMethod::Bayer16, DitherMethod::Cluster16] {
			assert!(dither(&gray(8, 8, 0), method, ColorKey::None).pixels.iter().all(|&p| p == 0));
			assert!(dither(&gray(8, 8, 255), method, ColorKey::None).pixels.iter().all(|&p| p == 0xFFFFFF));
		}
	}

	#[test]
	fn key_decides_the_off_color() {
		assert_eq!(dither_colors(ColorKey::Transparent(0xFF00FF)), (0xFFFFFF, 0xFF00FF));
		assert_eq!(dither_colors(ColorKey::Opaque(0x00FF00)), (0x00FF00, 0xFF00FF));
		let out: SourceImage = dither(&gray(2, 1, 0), DitherMethod::Bayer4, ColorKey::Transparent(0x123456));
		assert_eq!(out.pixels, vec![0x123456, 0x123456]);
	}

	#[test]
	fn key_pixels_stay_transparent() {
		let key: ColorKey = ColorKey::Transparent(0xFF00FF);
		let filled: SourceImage = SourceImage { width: 8, height: 8, pixels: vec![0xFF00FF; 64] };

		for method in [DitherMethod::None, DitherMethod::Floyd, DitherMethod::Bayer4, DitherMethod::Cluster8] {
			let out: SourceImage = dither(&filled, method, key);
			assert!(out.pixels.iter().all(|&p| key.is_transparent(p)), "{:?}", method);
		}
	}

	#[test]
	fn key_pixels_take_no_diffused_error() {
		let key: ColorKey = ColorKey::Transparent(0xFF00FF);
		// Gray left half, key right half
		let pixels: Vec<u32> = (0..64).map(|i| if i % 8 < 4 { 0x808080 } else { 0xFF00FF }).collect();
		let image: SourceImage = SourceImage { width: 8, height: 8, pixels };

		for method in [DitherMethod::Floyd, DitherMethod::Bayer4] {
			let out: SourceImage = dither(&image, method, key);
			for (i, &p) in out.pixels.iter().enumerate() {
				if i % 8 >= 4 {
					assert_eq!(p, 0xFF00FF, "{:?} pixel {}", method, i);
				}
			}
			let lit: usize = out.pixels.iter().filter(|&&p| p == 0xFFFFFF).count();
			assert!((10..=22).contains(&lit), "{:?} lit {}", method, lit);
		}
	}
}
