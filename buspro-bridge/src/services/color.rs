use crate::models::{ChannelLevels, ColorState};

/// Saturation below which a light is driven as plain white
pub const NEUTRAL_SATURATION: u8 = 10;

/// Converts hue (degrees), saturation and brightness (percent) into channel
/// levels using the hue sector decomposition.
pub fn hsv_to_rgb(hue: u16, saturation: u8, brightness: u8) -> ChannelLevels {
    let h = (hue % 360) as f64;
    let s = saturation.min(100) as f64 / 100.0;
    let v = brightness.min(100) as f64 / 100.0;

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    ChannelLevels::new(to_level(r + m), to_level(g + m), to_level(b + m))
}

/// Inverse of [`hsv_to_rgb`], returns `(hue, saturation, brightness)`
pub fn rgb_to_hsv(levels: ChannelLevels) -> (u16, u8, u8) {
    let r = levels.red.min(100) as f64 / 100.0;
    let g = levels.green.min(100) as f64 / 100.0;
    let b = levels.blue.min(100) as f64 / 100.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0
    } else {
        let sector = if max == r {
            ((g - b) / delta) % 6.0
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };
        ((sector * 60.0).round() as i32).rem_euclid(360) as u16
    };

    let saturation = if max == 0.0 { 0 } else { to_level(delta / max) };

    (hue, saturation, to_level(max))
}

/// Levels a light in `color` should be driven at
pub fn levels_for(color: &ColorState) -> ChannelLevels {
    if !color.on {
        ChannelLevels::OFF
    } else if color.saturation < NEUTRAL_SATURATION {
        ChannelLevels::white(color.brightness.min(100))
    } else {
        hsv_to_rgb(color.hue, color.saturation, color.brightness)
    }
}

fn to_level(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}
