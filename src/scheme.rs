use log::{info, warn};

use crate::{
	block_scan::GridParams,
	color::ColorMapper,
	emitter::{CountingSink, TableEmitter},
	error::Warning,
	shared_types::{CropClass, Depth, ExportParameters, RleKind, Scheme, SourceImage},
	table_make,
};


/// Whether `scheme` can encode blocks of `width`x`height` under `params`.
pub fn compatible(scheme: Scheme, params: &ExportParameters, width: u32, height: u32) -> bool {
	let rle_depth: bool = matches!(params.depth, Depth::Four | Depth::Eight);

	match scheme {
		Scheme::None => true,
		Scheme::Crop(class) | Scheme::CropLine(class) => {
			params.key.is_active() && width <= class.max_size() && height <= class.max_size()
		},
		Scheme::Rle(RleKind::Rle0) => params.key.is_active() && rle_depth,
		Scheme::Rle(RleKind::Rle4) => params.depth == Depth::Four,
		Scheme::Rle(RleKind::Rle8) => rle_depth,
	}
}


/// Turns an explicitly requested scheme into one that can run, with a
/// warning for every change. Running it again on its own output changes
/// nothing.
pub fn sanitize(scheme: Scheme, params: &ExportParameters, width: u32, height: u32) -> (Scheme, Vec<Warning>) {
	let mut warnings: Vec<Warning> = Vec::new();

	let scheme: Scheme = match scheme {
		Scheme::Crop(class) | Scheme::CropLine(class) => {
			if !params.key.is_active() {
				warnings.push(Warning::SchemeNeedsTransparency(scheme));
				Scheme::None
			}
			else if width > class.max_size() || height > class.max_size() {
				warnings.push(Warning::BlockTooLarge { scheme, width, height });
				Scheme::None
			}
			else {
				scheme
			}
		},

		Scheme::Rle(kind) => {
			if kind == RleKind::Rle0 && !params.key.is_active() {
				warnings.push(Warning::SchemeNeedsTransparency(scheme));
				Scheme::None
			}
			else if matches!(params.depth, Depth::One | Depth::Two) {
				warnings.push(Warning::RleNeedsDepth);
				Scheme::None
			}
			else if kind == RleKind::Rle4 && params.depth == Depth::Eight {
				warnings.push(Warning::Rle4Upgraded);
				Scheme::Rle(RleKind::Rle8)
			}
			else {
				scheme
			}
		},

		Scheme::None => Scheme::None,
	};

	(scheme, warnings)
}


/// Picks a scheme from the parameters alone, without encoding anything.
pub fn auto(params: &ExportParameters) -> Scheme {
	let grid: &GridParams = &params.grid;
	if grid.is_whole_image() {
		return Scheme::None;
	}

	if !params.key.is_active() {
		if params.depth == Depth::Four {
			return Scheme::Rle(RleKind::Rle4);
		}
		return Scheme::None;
	}

	let class: CropClass = match [CropClass::C16, CropClass::C32, CropClass::C256]
		.into_iter()
		.find(|class| grid.size_x <= class.max_size() && grid.size_y <= class.max_size())
	{
		Some(class) => class,
		None => return Scheme::None,
	};

	match params.depth {
		Depth::One | Depth::Two => Scheme::Crop(class),
		Depth::Four | Depth::Eight => Scheme::CropLine(class),
	}
}


/// Runs every compatible candidate against a counting sink and keeps the
/// smallest; the earlier candidate wins a tie.
pub fn best(image: &SourceImage, mapper: &ColorMapper, params: &ExportParameters) -> (Scheme, Vec<Warning>) {
	let grid: GridParams = params.grid.effective(image.width, image.height);
	let mut chosen: Option<(Scheme, u32)> = None;

	info!("Start benchmark to find the best compressor");

	for scheme in Scheme::CANDIDATES {
		if !compatible(scheme, params, grid.size_x, grid.size_y) {
			info!("- {}: incompatible", scheme.short_name());
			continue;
		}

		let mut counter: CountingSink = CountingSink::default();
		match table_make::export_bitmap(image, mapper, params, scheme, &mut counter) {
			Ok(_) => {
				let size: u32 = counter.total_bytes();
				info!("- {}: {} bytes", scheme.short_name(), size);

				if chosen.map_or(true, |(_, best_size)| size < best_size) {
					chosen = Some((scheme, size));
				}
			},
			Err(error) => warn!("- {}: {}", scheme.short_name(), error),
		}
	}

	match chosen {
		Some((scheme, size)) => {
			info!("Best compressor selected: {} ({} bytes)", scheme, size);
			(scheme, Vec::new())
		},
		None => (Scheme::None, vec![Warning::NoSchemeFound]),
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::palette::Palette;
	use crate::shared_types::ColorKey;

	const KEY: u32 = 0xFF00FF;

	fn params(depth: Depth, key: ColorKey, size: u32) -> ExportParameters {
		ExportParameters {
			depth,
			key,
			grid: GridParams {
				size_x: size,
				size_y: size,
				..GridParams::default()
			},
			..ExportParameters::default()
		}
	}

	fn sprite() -> SourceImage {
		let mut pixels: Vec<u32> = vec![KEY; 256];
		for y in 2..14 {
			for x in 4..(2 + y) {
				pixels[y * 16 + x] = if x % 3 == 0 { 0xFFFFFF } else { 0x3EB849 };
			}
		}
		SourceImage {
			width: 16,
			height: 16,
			pixels,
		}
	}

	#[test]
	fn crop_needs_a_key() {
		let p: ExportParameters = params(Depth::One, ColorKey::None, 8);
		for class in [CropClass::C16, CropClass::C32, CropClass::C256] {
			assert!(!compatible(Scheme::Crop(class), &p, 8, 8));
			assert!(!compatible(Scheme::CropLine(class), &p, 8, 8));
		}
		assert!(compatible(Scheme::None, &p, 8, 8));
	}

	#[test]
	fn rle_needs_depth_four_or_eight() {
		let p: ExportParameters = params(Depth::Two, ColorKey::Transparent(KEY), 16);
		assert!(!compatible(Scheme::Rle(RleKind::Rle8), &p, 16, 16));
		assert_eq!(sanitize(Scheme::Rle(RleKind::Rle8), &p, 16, 16), (Scheme::None, vec![Warning::RleNeedsDepth]));

		let p: ExportParameters = params(Depth::Eight, ColorKey::None, 16);
		assert!(!compatible(Scheme::Rle(RleKind::Rle4), &p, 16, 16));
		assert!(!compatible(Scheme::Rle(RleKind::Rle0), &p, 16, 16));
		assert_eq!(sanitize(Scheme::Rle(RleKind::Rle4), &p, 16, 16), (Scheme::Rle(RleKind::Rle8), vec![Warning::Rle4Upgraded]));
	}

	#[test]
	fn sanitize_is_idempotent() {
		let cases: [ExportParameters; 4] = [
			params(Depth::One, ColorKey::None, 8),
			params(Depth::Four, ColorKey::Transparent(KEY), 24),
			params(Depth::Eight, ColorKey::Opaque(KEY), 300),
			params(Depth::Two, ColorKey::Transparent(KEY), 16),
		];

		for p in &cases {
			for scheme in Scheme::CANDIDATES {
				let (once, _) = sanitize(scheme, p, p.grid.size_x, p.grid.size_y);
				let (twice, warnings) = sanitize(once, p, p.grid.size_x, p.grid.size_y);
				assert_eq!(once, twice);
				assert!(warnings.is_empty());
				assert!(compatible(once, p, p.grid.size_x, p.grid.size_y));
			}
		}
	}

	#[test]
	fn auto_follows_depth_and_size() {
		let key: ColorKey = ColorKey::Transparent(KEY);

		assert_eq!(auto(&params(Depth::One, key, 16)), Scheme::Crop(CropClass::C16));
		assert_eq!(auto(&params(Depth::Two, key, 24)), Scheme::Crop(CropClass::C32));
		assert_eq!(auto(&params(Depth::Four, key, 16)), Scheme::CropLine(CropClass::C16));
		assert_eq!(auto(&params(Depth::Eight, key, 200)), Scheme::CropLine(CropClass::C256));
		assert_eq!(auto(&params(Depth::Eight, key, 257)), Scheme::None);
		assert_eq!(auto(&params(Depth::Four, ColorKey::None, 16)), Scheme::Rle(RleKind::Rle4));
		assert_eq!(auto(&params(Depth::Eight, ColorKey::None, 16)), Scheme::None);
		assert_eq!(auto(&params(Depth::Four, key, 0)), Scheme::None);
	}

	#[test]
	fn best_beats_crop_line16_and_is_repeatable() {
		let image: SourceImage = sprite();
		let p: ExportParameters = params(Depth::Eight, ColorKey::Transparent(KEY), 16);
		let mapper: ColorMapper = ColorMapper::new(Depth::Eight, Palette::reference(Depth::Eight), p.key);

		let mut reference: CountingSink = CountingSink::default();
		table_make::export_bitmap(&image, &mapper, &p, Scheme::CropLine(CropClass::C16), &mut reference).unwrap();

		let (first, warnings) = best(&image, &mapper, &p);
		let (second, _) = best(&image, &mapper, &p);
		assert!(warnings.is_empty());
		assert_eq!(first, second);

		let mut chosen: CountingSink = CountingSink::default();
		let mut again: CountingSink = CountingSink::default();
		table_make::export_bitmap(&image, &mapper, &p, first, &mut chosen).unwrap();
		table_make::export_bitmap(&image, &mapper, &p, first, &mut again).unwrap();
		assert_eq!(chosen.total_bytes(), again.total_bytes());
		assert!(chosen.total_bytes() <= reference.total_bytes());

		for scheme in Scheme::CANDIDATES {
			if !compatible(scheme, &p, 16, 16) {
				continue;
			}
			let mut other: CountingSink = CountingSink::default();
			if table_make::export_bitmap(&image, &mapper, &p, scheme, &mut other).is_ok() {
				assert!(chosen.total_bytes() <= other.total_bytes(), "{:?}", scheme);
			}
		}
	}

	#[test]
	fn best_without_key_on_one_bit_keeps_plain() {
		let image: SourceImage = SourceImage {
			width: 8,
			height: 8,
			pixels: vec![0; 64],
		};
		let p: ExportParameters = params(Depth::One, ColorKey::None, 8);
		let mapper: ColorMapper = ColorMapper::new(Depth::One, Palette::reference(Depth::One), p.key);

		assert_eq!(best(&image, &mapper, &p), (Scheme::None, Vec::new()));
	}
}
