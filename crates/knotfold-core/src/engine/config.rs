use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Mirror probability must lie in [0, 1], got {0}")]
    InvalidMirrorProbability(f64),
}

/// Starting conformation of the polygon.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialPolygon {
    /// A regular polygon of edge length 1 in the z = 0 plane.
    Circle { vertex_count: usize },
    /// Explicit vertex coordinates, in chain order.
    Coordinates(Vec<Point3<f64>>),
}

/// Parameters of a sampling run.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub polygon: InitialPolygon,
    pub hard_sphere_diameter: f64,
    /// Seed for the sampler's private PRNG; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Probability that a pivot rotation is additionally mirrored.
    pub mirror_probability: f64,
}

#[derive(Debug, Default)]
pub struct SamplerConfigBuilder {
    polygon: Option<InitialPolygon>,
    hard_sphere_diameter: Option<f64>,
    seed: Option<u64>,
    mirror_probability: Option<f64>,
}

impl SamplerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn circle(mut self, vertex_count: usize) -> Self {
        self.polygon = Some(InitialPolygon::Circle { vertex_count });
        self
    }

    pub fn coordinates(mut self, coordinates: Vec<Point3<f64>>) -> Self {
        self.polygon = Some(InitialPolygon::Coordinates(coordinates));
        self
    }

    pub fn hard_sphere_diameter(mut self, diameter: f64) -> Self {
        self.hard_sphere_diameter = Some(diameter);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn mirror_probability(mut self, probability: f64) -> Self {
        self.mirror_probability = Some(probability);
        self
    }

    pub fn build(self) -> Result<SamplerConfig, ConfigError> {
        let mirror_probability = self.mirror_probability.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&mirror_probability) {
            return Err(ConfigError::InvalidMirrorProbability(mirror_probability));
        }
        Ok(SamplerConfig {
            polygon: self.polygon.ok_or(ConfigError::MissingParameter("polygon"))?,
            hard_sphere_diameter: self
                .hard_sphere_diameter
                .ok_or(ConfigError::MissingParameter("hard_sphere_diameter"))?,
            seed: self.seed,
            mirror_probability,
        })
    }
}
