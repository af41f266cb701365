use crate::error::{ConfigError, SimResult, SimulationError};
use crate::fv_core::{
    condition::{BoundaryKind, ChannelBC, InitialCondition},
    flux::EulerFlux,
    initial::{cylinder_in_stream, open_channel, pulse_in_stream, Cylinder, FreeStream, GaussianPulse},
    mesh::{Mesh, Mesh2d},
    validation::ValidationPolicy,
};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Grid configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
    pub lx: f64,
    pub ly: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            nx: 200,
            ny: 100,
            lx: 2.0,
            ly: 1.0,
        }
    }
}

impl GridConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.nx == 0 || self.ny == 0 {
            return Err(ConfigError::EmptyGrid {
                nx: self.nx,
                ny: self.ny,
            });
        }
        if !(self.lx > 0.0 && self.ly > 0.0) {
            return Err(ConfigError::NonPositiveLength {
                lx: self.lx,
                ly: self.ly,
            });
        }
        Ok(())
    }
}

/// Gas model and stability factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    #[serde(default = "default_cfl")]
    pub cfl: f64,
}

fn default_gamma() -> f64 {
    1.4
}

fn default_cfl() -> f64 {
    0.5
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            gamma: default_gamma(),
            cfl: default_cfl(),
        }
    }
}

impl PhysicsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.gamma > 1.0) {
            return Err(ConfigError::InvalidGamma(self.gamma));
        }
        if !(self.cfl > 0.0 && self.cfl <= 1.0) {
            return Err(ConfigError::InvalidCfl(self.cfl));
        }
        Ok(())
    }
}

/// Edge policies, listed as `inflow`, `outflow` or `reflective`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    pub left: BoundaryKind,
    pub right: BoundaryKind,
    pub bottom: BoundaryKind,
    pub top: BoundaryKind,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        BoundaryConfig {
            left: BoundaryKind::Inflow,
            right: BoundaryKind::Outflow,
            bottom: BoundaryKind::Reflective,
            top: BoundaryKind::Reflective,
        }
    }
}

/// Loop length, reporting and execution settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_n_steps")]
    pub n_steps: usize,
    #[serde(default = "default_diagnostic_interval")]
    pub diagnostic_interval: usize,
    #[serde(default)]
    pub validation: ValidationPolicy,
    /// Worker threads, 0 keeps the rayon default.
    #[serde(default)]
    pub threads: usize,
}

fn default_n_steps() -> usize {
    2000
}

fn default_diagnostic_interval() -> usize {
    50
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            n_steps: default_n_steps(),
            diagnostic_interval: default_diagnostic_interval(),
            validation: ValidationPolicy::default(),
            threads: 0,
        }
    }
}

/// Complete simulation configuration.
///
/// Every section may be left out of a TOML file and takes its default, except
/// `obstacle` and `pulse` which are only present when written out. The
/// in-code [`Default`] is the cylinder run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub free_stream: FreeStream,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle: Option<Cylinder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<GaussianPulse>,
    #[serde(default)]
    pub boundaries: BoundaryConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            grid: GridConfig::default(),
            physics: PhysicsConfig::default(),
            free_stream: FreeStream::default(),
            obstacle: Some(Cylinder::default()),
            pulse: None,
            boundaries: BoundaryConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SimulationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> SimResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.physics.validate()?;

        let fs = &self.free_stream;
        if !(fs.rho > 0.0 && fs.p > 0.0) {
            return Err(ConfigError::InvalidFreeStream { rho: fs.rho, p: fs.p });
        }

        if let Some(cylinder) = &self.obstacle {
            self.validate_obstacle(cylinder)?;
        }

        if let Some(pulse) = &self.pulse {
            if !(pulse.sigma > 0.0 && pulse.amplitude > -1.0) {
                return Err(ConfigError::InvalidPulse {
                    sigma: pulse.sigma,
                    amplitude: pulse.amplitude,
                });
            }
        }

        if self.run.diagnostic_interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    fn validate_obstacle(&self, cylinder: &Cylinder) -> Result<(), ConfigError> {
        let GridConfig { nx, ny, .. } = self.grid;
        if !(cylinder.radius > 0.0) {
            return Err(ConfigError::InvalidRadius(cylinder.radius));
        }

        let mesh = self.mesh();
        let (dx, dy) = (mesh.get_dx(), mesh.get_dy());

        // interior cell centre nearest to the disc centre
        let nearest = |c: f64, h: f64, n: usize| (c / h).floor().clamp(0.0, (n - 1) as f64) as usize + 1;
        let (px, py) = mesh.get_cell(nearest(cylinder.cx, dx, nx), nearest(cylinder.cy, dy, ny));
        if !cylinder.contains(px, py) {
            return Err(ConfigError::ObstacleOutside {
                cx: cylinder.cx,
                cy: cylinder.cy,
                radius: cylinder.radius,
            });
        }

        // the disc is convex, so holding the four corner cell centres means
        // holding every interior centre
        let corners = [
            mesh.get_cell(1, 1),
            mesh.get_cell(nx, 1),
            mesh.get_cell(1, ny),
            mesh.get_cell(nx, ny),
        ];
        if corners.iter().all(|&(x, y)| cylinder.contains(x, y)) {
            return Err(ConfigError::ObstacleCoversDomain);
        }
        Ok(())
    }

    pub fn mesh(&self) -> Mesh2d {
        Mesh2d::new(self.grid.lx, self.grid.ly, self.grid.nx, self.grid.ny)
    }

    pub fn flux(&self) -> EulerFlux {
        EulerFlux {
            gamma: self.physics.gamma,
        }
    }

    pub fn boundary(&self) -> ChannelBC {
        ChannelBC {
            left: self.boundaries.left,
            right: self.boundaries.right,
            bottom: self.boundaries.bottom,
            top: self.boundaries.top,
            inflow: self.free_stream.conserved(self.physics.gamma),
        }
    }

    pub fn initial_condition(&self) -> Box<dyn InitialCondition> {
        let gamma = self.physics.gamma;
        let base = match self.obstacle {
            Some(cylinder) => cylinder_in_stream(self.free_stream, gamma, cylinder),
            None => open_channel(self.free_stream, gamma),
        };
        match self.pulse {
            Some(pulse) => Box::new(pulse_in_stream(base, pulse)),
            None => Box::new(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_run() {
        let config = SimulationConfig::default();
        assert_eq!(config.grid.nx, 200);
        assert_eq!(config.grid.ny, 100);
        assert_eq!(config.physics.gamma, 1.4);
        assert_eq!(config.physics.cfl, 0.5);
        assert_eq!(config.run.n_steps, 2000);
        assert_eq!(config.run.diagnostic_interval, 50);
        assert_eq!(config.obstacle, Some(Cylinder::default()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_sections_fall_back_to_defaults() {
        let config = SimulationConfig::from_toml(
            r#"
            [grid]
            nx = 50
            ny = 25
            lx = 2.0
            ly = 1.0

            [obstacle]
            cx = 0.4
            cy = 0.5
            radius = 0.05

            [boundaries]
            left = "inflow"
            right = "outflow"
            bottom = "outflow"
            top = "reflective"

            [run]
            n_steps = 10
            validation = "abort"
            "#,
        )
        .unwrap();

        assert_eq!(config.grid.nx, 50);
        assert_eq!(config.physics, PhysicsConfig::default());
        assert_eq!(config.free_stream, FreeStream::default());
        assert_eq!(config.obstacle.unwrap().cx, 0.4);
        assert!(config.pulse.is_none());
        assert_eq!(config.boundaries.bottom, BoundaryKind::Outflow);
        assert_eq!(config.run.n_steps, 10);
        assert_eq!(config.run.diagnostic_interval, 50);
        assert_eq!(config.run.validation, ValidationPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_has_no_obstacle() {
        let config = SimulationConfig::from_toml("").unwrap();
        assert!(config.obstacle.is_none());
        assert_eq!(config.grid, GridConfig::default());
    }

    #[test]
    fn test_serialised_default_reloads() {
        let config = SimulationConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back = SimulationConfig::from_toml(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SimulationConfig::from_file("/nonexistent/euler.toml").unwrap_err();
        assert!(matches!(err, SimulationError::Io { .. }));
    }

    #[test]
    fn test_rejects_bad_grid_and_physics() {
        let mut config = SimulationConfig::default();
        config.grid.ny = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyGrid { nx: 200, ny: 0 }));

        let mut config = SimulationConfig::default();
        config.grid.lx = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::NonPositiveLength { .. })));

        let mut config = SimulationConfig::default();
        config.physics.cfl = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidCfl(0.0)));

        let mut config = SimulationConfig::default();
        config.physics.cfl = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidCfl(1.5)));

        let mut config = SimulationConfig::default();
        config.physics.gamma = 1.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidGamma(1.0)));

        let mut config = SimulationConfig::default();
        config.free_stream.p = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFreeStream { .. })));

        let mut config = SimulationConfig::default();
        config.run.diagnostic_interval = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
    }

    #[test]
    fn test_rejects_bad_obstacles() {
        let mut config = SimulationConfig::default();
        config.obstacle = Some(Cylinder {
            cx: 3.0,
            cy: 0.5,
            radius: 0.5,
        });
        assert!(matches!(config.validate(), Err(ConfigError::ObstacleOutside { .. })));

        config.obstacle = Some(Cylinder {
            cx: 1.0,
            cy: 0.5,
            radius: 2.0,
        });
        assert_eq!(config.validate(), Err(ConfigError::ObstacleCoversDomain));

        config.obstacle = Some(Cylinder {
            cx: 1.0,
            cy: 0.5,
            radius: 0.0,
        });
        assert_eq!(config.validate(), Err(ConfigError::InvalidRadius(0.0)));

        // tangent to the left wall, no interior centre inside
        config.obstacle = Some(Cylinder {
            cx: -0.05,
            cy: 0.5,
            radius: 0.05,
        });
        assert!(matches!(config.validate(), Err(ConfigError::ObstacleOutside { .. })));

        // small enough to fall between cell centres
        config.obstacle = Some(Cylinder {
            cx: 0.51,
            cy: 0.51,
            radius: 0.001,
        });
        assert!(matches!(config.validate(), Err(ConfigError::ObstacleOutside { .. })));

        // one centre is enough
        config.obstacle = Some(Cylinder {
            cx: 0.505,
            cy: 0.505,
            radius: 0.001,
        });
        assert!(config.validate().is_ok());

        // overlapping the wall is allowed
        config.obstacle = Some(Cylinder {
            cx: 1.0,
            cy: -0.05,
            radius: 0.2,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_pulse() {
        let mut config = SimulationConfig::default();
        config.pulse = Some(GaussianPulse {
            x: 1.0,
            y: 0.5,
            sigma: 0.1,
            amplitude: -1.0,
        });
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPulse { .. })));
    }
}
