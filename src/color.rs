use crate::palette::Palette;
use crate::shared_types::{ColorKey, Depth};


#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Rgb24 {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Rgb24 {
	pub fn from_u32(rgb: u32) -> Rgb24 {
		Rgb24 {
			r: (rgb >> 16) as u8,
			g: (rgb >> 8) as u8,
			b: rgb as u8,
		}
	}

	/// Sum of the per-channel differences.
	pub fn distance(self, other: Rgb24) -> u32 {
		self.r.abs_diff(other.r) as u32 + self.g.abs_diff(other.g) as u32 + self.b.abs_diff(other.b) as u32
	}
}


/// Platform 8-bit color, `[G:3|R:3|B:2]`.
pub fn rgb_to_grb8(color: Rgb24) -> u8 {
	let r: u32 = color.r as u32 * 7 / 255;
	let g: u32 = color.g as u32 * 7 / 255;
	let b: u32 = color.b as u32 * 3 / 255;

	((g << 5) + (r << 2) + b) as u8
}


/// Key used by the direct-color depths: without a configured key, black
/// plays the role of the transparency color.
fn direct_key(key: ColorKey) -> ColorKey {
	match key {
		ColorKey::None => ColorKey::Transparent(0x000000),
		_ => key,
	}
}


/// Converts one pixel to its code at `depth`. Transparent pixels map to 0.
pub fn map_pixel(depth: Depth, rgb: u32, palette: &Palette, key: ColorKey) -> u8 {
	let rgb: u32 = rgb & 0xFFFFFF;

	match depth {
		Depth::Eight => {
			if direct_key(key).is_transparent(rgb) {
				return 0;
			}

			let color: Rgb24 = Rgb24::from_u32(rgb);
			let code: u8 = rgb_to_grb8(color);

			// 0 stays reserved for transparency
			if code == 0 {
				if color.g > color.r {
					return 0x20;
				}
				return 0x04;
			}

			code
		},

		Depth::One => !direct_key(key).is_transparent(rgb) as u8,

		Depth::Two | Depth::Four => {
			if key.is_transparent(rgb) {
				return 0;
			}
			palette.nearest(rgb)
		},
	}
}


/// A configured mapper for one export run.
#[derive(Clone, Debug)]
pub struct ColorMapper {
	pub depth: Depth,
	pub palette: Palette,
	pub key: ColorKey,
}

impl ColorMapper {
	pub fn new(depth: Depth, palette: Palette, key: ColorKey) -> ColorMapper {
		ColorMapper { depth, palette, key }
	}

	pub fn map(&self, rgb: u32) -> u8 {
		map_pixel(self.depth, rgb, &self.palette, self.key)
	}

	pub fn is_transparent(&self, rgb: u32) -> bool {
		self.key.is_transparent(rgb)
	}
}
