use std::collections::HashSet;

use color_quant::NeuQuant;
use log::debug;

use crate::color::Rgb24;
use crate::error::Warning;
use crate::shared_types::{ColorKey, Depth, PaletteKind, PaletteSettings};

/// The 16 fixed colors of the platform. Entry 0 is transparent.
pub const REFERENCE_PALETTE: [u32; 16] = [
	0x000000, 0x000000, 0x3EB849, 0x74D07D,
	0x5955E0, 0x8076F1, 0xB95E51, 0x65DBEF,
	0xDB6559, 0xFF897D, 0xCCC35E, 0xDED087,
	0x3AA241, 0xB766B5, 0xCCCCCC, 0xFFFFFF,
];

// Sampling factor handed to NeuQuant, 1 is slowest and best
const QUANT_SAMPLE_FACTOR: i32 = 10;


/// Index to RGB table of an indexed export. Only the `count` entries
/// starting at `first` take part in color matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
	pub entries: Vec<u32>,
	pub first: usize,
	pub count: usize,
}

impl Palette {
	pub fn reference(depth: Depth) -> Palette {
		let size: usize = depth.color_count().min(REFERENCE_PALETTE.len());

		Palette {
			entries: REFERENCE_PALETTE[..size].to_vec(),
			first: 1,
			count: size - 1,
		}
	}

	/// Index of the closest active entry; ties go to the lowest index.
	pub fn nearest(&self, rgb: u32) -> u8 {
		let color: Rgb24 = Rgb24::from_u32(rgb);
		let mut best_index: usize = self.first;
		let mut best_weight: u32 = u32::MAX;

		for index in self.first..self.first + self.count {
			let weight: u32 = color.distance(Rgb24::from_u32(self.entries[index]));
			if weight < best_weight {
				best_weight = weight;
				best_index = index;
			}
		}

		best_index as u8
	}

	pub fn rgb(&self, index: u8) -> u32 {
		self.entries.get(index as usize).copied().unwrap_or(0)
	}

	/// Active `(index, color)` pairs, in index order.
	pub fn active(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
		(self.first..self.first + self.count).map(move |index| (index, self.entries[index]))
	}
}


/// Platform palette register format: `[0|R:3|0|B:3] [0:5|G:3]`.
pub fn platform_bytes(rgb: u32) -> [u8; 2] {
	let color: Rgb24 = Rgb24::from_u32(rgb);
	[((color.r >> 5) << 4) + (color.b >> 5), color.g >> 5]
}


/// Builds the palette of an export run. Depths without a palette get the
/// reference one, which the color mapper then ignores.
pub fn build(depth: Depth, settings: &PaletteSettings, key: ColorKey, pixels: &[u32]) -> (Palette, Vec<Warning>) {
	let mut warnings: Vec<Warning> = Vec::new();

	if !depth.is_indexed() {
		return (Palette::reference(depth), warnings);
	}

	let limit: usize = depth.color_count();
	let offset: usize = settings.offset.min(limit - 1);
	let mut count: usize = settings.count;

	if offset + count > limit {
		let clamped: usize = limit - offset;
		warnings.push(Warning::PaletteCountClamped {
			offset,
			count,
			limit,
			clamped,
		});
		count = clamped;
	}

	match settings.kind {
		PaletteKind::Reference => {
			let mut palette: Palette = Palette::reference(depth);
			palette.first = offset;
			palette.count = count;
			(palette, warnings)
		},

		PaletteKind::Custom => {
			// Transparent pixels must not take a slot of their own
			let working: Vec<u32> = pixels.iter()
				.map(|&rgb| if key.is_transparent(rgb) { 0 } else { rgb & 0xFFFFFF })
				.collect();

			let colors: Vec<u32> = quantize(&working, count);
			let mut entries: Vec<u32> = vec![0; limit];

			for (slot, color) in colors.iter().enumerate() {
				entries[offset + slot] = *color;
			}

			debug!("Custom palette: {} colors at offset {}", colors.len(), offset);

			let palette: Palette = Palette {
				entries,
				first: offset,
				count: colors.len().max(1),
			};
			(palette, warnings)
		},
	}
}


/// Reduces `pixels` to at most `count` colors. Images already within the
/// budget keep their exact colors, in order of first appearance.
pub fn quantize(pixels: &[u32], count: usize) -> Vec<u32> {
	let mut seen: HashSet<u32> = HashSet::new();
	let mut unique: Vec<u32> = Vec::new();

	for &rgb in pixels {
		let rgb: u32 = rgb & 0xFFFFFF;
		if seen.insert(rgb) {
			unique.push(rgb);
			if unique.len() > count {
				break;
			}
		}
	}

	if unique.len() <= count {
		return unique;
	}

	let mut rgba: Vec<u8> = Vec::with_capacity(pixels.len() * 4);
	for &rgb in pixels {
		rgba.push((rgb >> 16) as u8);
		rgba.push((rgb >> 8) as u8);
		rgba.push(rgb as u8);
		rgba.push(0xFF);
	}

	let quantizer: NeuQuant = NeuQuant::new(QUANT_SAMPLE_FACTOR, count, &rgba);

	quantizer.color_map_rgb()
		.chunks_exact(3)
		.map(|c| (c[0] as u32) << 16 | (c[1] as u32) << 8 | c[2] as u32)
		.collect()
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reference_palette_matches_depth() {
		let palette: Palette = Palette::reference(Depth::Four);
		assert_eq!(palette.entries.len(), 16);
		assert_eq!((palette.first, palette.count), (1, 15));

		let palette: Palette = Palette::reference(Depth::Two);
		assert_eq!(palette.entries.len(), 4);
		assert_eq!((palette.first, palette.count), (1, 3));
	}

	#[test]
	fn count_is_clamped_to_index_space() {
		let settings: PaletteSettings = PaletteSettings {
			kind: PaletteKind::Reference,
			count: 15,
			offset: 2,
			pal24: false,
		};
		let (palette, warnings) = build(Depth::Four, &settings, ColorKey::None, &[]);

		assert_eq!(palette.count, 14);
		assert_eq!(warnings, vec![Warning::PaletteCountClamped { offset: 2, count: 15, limit: 16, clamped: 14 }]);
	}

	#[test]
	fn custom_palette_keeps_exact_colors_when_few() {
		let settings: PaletteSettings = PaletteSettings {
			kind: PaletteKind::Custom,
			count: 3,
			offset: 1,
			pal24: false,
		};
		let pixels: Vec<u32> = vec![0xFF00FF, 0x112233, 0x445566, 0x112233, 0xFF00FF];
		let (palette, warnings) = build(Depth::Two, &settings, ColorKey::Transparent(0xFF00FF), &pixels);

		assert!(warnings.is_empty());
		// Transparent pink became black before quantization
		assert_eq!(palette.entries, vec![0x000000, 0x000000, 0x112233, 0x445566]);
		assert_eq!(palette.nearest(0x112234), 2);
		assert_eq!(palette.nearest(0x445566), 3);
	}

	#[test]
	fn quantize_reduces_to_requested_count() {
		let pixels: Vec<u32> = (0..64u32).map(|v| v * 0x040404).collect();
		let colors: Vec<u32> = quantize(&pixels, 4);
		assert_eq!(colors.len(), 4);
	}

	#[test]
	fn platform_format_packs_three_bits_per_channel() {
		assert_eq!(platform_bytes(0xFFFFFF), [0x77, 0x07]);
		assert_eq!(platform_bytes(0x3EB849), [0x12, 0x05]);
	}
}
