use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

/// Per-channel levels in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLevels {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl ChannelLevels {
    pub const OFF: Self = Self::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub const fn white(level: u8) -> Self {
        Self::new(level, level, level)
    }

    pub fn get(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
            Channel::Blue => self.blue,
        }
    }

    pub fn set(&mut self, channel: Channel, level: u8) {
        let level = level.min(100);
        match channel {
            Channel::Red => self.red = level,
            Channel::Green => self.green = level,
            Channel::Blue => self.blue = level,
        }
    }
}

/// Bus channel numbers a light is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl ChannelMap {
    pub fn iter(&self) -> impl Iterator<Item = (Channel, u8)> {
        [
            (Channel::Red, self.red),
            (Channel::Green, self.green),
            (Channel::Blue, self.blue),
        ]
        .into_iter()
    }
}

/// Color kept across an off/on cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSnapshot {
    pub hue: u16,
    pub saturation: u8,
    pub brightness: u8,
}

impl Default for ColorSnapshot {
    fn default() -> Self {
        Self {
            hue: 0,
            saturation: 100,
            brightness: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorState {
    pub on: bool,
    pub hue: u16,
    pub saturation: u8,
    pub brightness: u8,
    pub last_color: ColorSnapshot,
}

impl ColorState {
    /// Off state previewing `last_color` once switched on
    pub fn restored(last_color: ColorSnapshot) -> Self {
        Self {
            on: false,
            hue: last_color.hue,
            saturation: last_color.saturation,
            brightness: last_color.brightness,
            last_color,
        }
    }

    pub fn snapshot(&self) -> ColorSnapshot {
        ColorSnapshot {
            hue: self.hue,
            saturation: self.saturation,
            brightness: self.brightness,
        }
    }
}

impl Default for ColorState {
    fn default() -> Self {
        Self::restored(ColorSnapshot::default())
    }
}
