#[derive(Debug, PartialEq)]
pub struct ParticleCloud {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
}

impl ParticleCloud {
    /// Scatters `count` points uniformly in a cube of side `spread` centered on
    /// the origin. `random` must yield samples in `[0, 1)`.
    pub fn generate(count: usize, spread: f64, palette: &[u32], mut random: impl FnMut() -> f64) -> Self {
        let mut positions = Vec::with_capacity(count * 3);
        let mut colors = Vec::with_capacity(count * 3);

        for _ in 0..count {
            for _ in 0..3 {
                positions.push(((random() - 0.5) * spread) as f32);
            }

            let color = pick(palette, random()).map(rgb_components).unwrap_or([1.0; 3]);
            colors.extend_from_slice(&color);
        }

        Self { positions, colors }
    }

    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }
}

fn pick(palette: &[u32], sample: f64) -> Option<u32> {
    if palette.is_empty() {
        return None;
    }

    let index = ((sample * palette.len() as f64) as usize).min(palette.len() - 1);
    palette.get(index).copied()
}

pub fn rgb_components(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
    [channel(16), channel(8), channel(0)]
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spin {
    pub x: f64,
    pub y: f64,
}

impl Spin {
    pub fn advance(&mut self, step_x: f64, step_y: f64) -> Self {
        self.x += step_x;
        self.y += step_y;
        *self
    }
}
