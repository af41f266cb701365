use crate::config::SimulationConfig;
use crate::diagnostics::{total_kinetic_energy, total_mass};
use crate::error::{SimResult, SimulationError, StateError};
use crate::fv_core::{
    condition::{initialize_mesh, BCEnforcer, ChannelBC},
    flux::EulerFlux,
    mesh::{Mesh, Mesh2d},
    state::{Field, ObstacleMask},
    validation::{self, ValidationPolicy},
};
use crate::time_integrator::lax_friedrichs::{calc_time_step, LaxFriedrichs2d, TimeIntegrator};

use serde::Serialize;
use std::iter::FusedIterator;
use tracing::{debug, info, warn};

/// One periodic reduction of the field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiagnosticSample {
    pub step: usize,
    pub time: f64,
    pub kinetic_energy: f64,
    pub mass: f64,
}

/// Owns both buffers and advances them one step at a time.
pub struct Simulation {
    mesh: Mesh2d,
    flux: EulerFlux,
    bc: ChannelBC,
    integrator: LaxFriedrichs2d,
    policy: ValidationPolicy,
    mask: ObstacleMask,
    current: Field,
    next: Field,
    dt: f64,
    steps_taken: usize,
    flagged: usize,
}

impl Simulation {
    pub fn new(config: &SimulationConfig) -> SimResult<Self> {
        config.validate()?;

        let mesh = config.mesh();
        let flux = config.flux();
        let bc = config.boundary();
        let init = config.initial_condition();
        let (current, mask) = initialize_mesh(&mesh, init.as_ref(), &bc);
        let next = current.clone();

        let s_max = config.free_stream.u.abs() + flux.sound_speed(config.free_stream.rho, config.free_stream.p);
        let dt = calc_time_step(mesh.get_dx(), mesh.get_dy(), config.physics.cfl, s_max);

        info!(
            nx = mesh.nx(),
            ny = mesh.ny(),
            dt,
            solid_cells = mask.count_interior(),
            "initialised field"
        );

        Ok(Simulation {
            mesh,
            flux,
            bc,
            integrator: LaxFriedrichs2d,
            policy: config.run.validation,
            mask,
            current,
            next,
            dt,
            steps_taken: 0,
            flagged: 0,
        })
    }

    /// Boundaries, stencil into the spare buffer, swap, then validation.
    pub fn step(&mut self) -> Result<(), StateError> {
        self.bc.enforce(&mut self.current);
        self.integrator.update(
            &self.current,
            &mut self.next,
            &self.mask,
            self.mesh.get_dx(),
            self.mesh.get_dy(),
            self.dt,
            &self.flux,
        );
        std::mem::swap(&mut self.current, &mut self.next);
        self.steps_taken += 1;

        self.enforce_policy()
    }

    fn enforce_policy(&mut self) -> Result<(), StateError> {
        match self.policy {
            ValidationPolicy::Off => Ok(()),
            ValidationPolicy::Abort => match validation::scan(&self.current, &self.flux).into_iter().next() {
                Some(err) => Err(err),
                None => Ok(()),
            },
            ValidationPolicy::Warn => {
                let bad = validation::scan(&self.current, &self.flux);
                if self.track_flagged(bad.len()) {
                    match bad.first() {
                        Some(first) => {
                            let (i, j) = first.cell();
                            warn!(step = self.steps_taken - 1, cells = bad.len(), i, j, "{}", first);
                        }
                        None => info!(step = self.steps_taken - 1, "field admissible again"),
                    }
                }
                Ok(())
            }
            ValidationPolicy::Clamp => {
                let touched = validation::clamp(&mut self.current, &self.flux)?;
                if touched > 0 {
                    debug!(step = self.steps_taken - 1, cells = touched, "clamped cells");
                }
                Ok(())
            }
        }
    }

    /// Records the number of inadmissible cells, true when it differs from
    /// the previous step.
    fn track_flagged(&mut self, count: usize) -> bool {
        let changed = count != self.flagged;
        self.flagged = count;
        changed
    }

    /// Inadmissible cells seen by the last `warn` scan.
    pub fn flagged_cells(&self) -> usize {
        self.flagged
    }

    pub fn sample(&self, step: usize) -> DiagnosticSample {
        DiagnosticSample {
            step,
            time: self.steps_taken as f64 * self.dt,
            kinetic_energy: total_kinetic_energy(&self.current),
            mass: total_mass(&self.current),
        }
    }

    pub fn state(&self) -> &Field {
        &self.current
    }

    pub fn mask(&self) -> &ObstacleMask {
        &self.mask
    }

    pub fn mesh(&self) -> &Mesh2d {
        &self.mesh
    }

    pub fn flux(&self) -> &EulerFlux {
        &self.flux
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }
}

/// Lazy sequence of diagnostic samples. Each call to `next` advances the
/// field up to the following sampled step; the sequence ends after
/// `n_steps` steps or at the first error.
pub struct Run {
    sim: Simulation,
    pool: Option<rayon::ThreadPool>,
    n_steps: usize,
    interval: usize,
    finished: bool,
}

pub fn run(config: SimulationConfig) -> SimResult<Run> {
    let pool = match config.run.threads {
        0 => None,
        threads => Some(rayon::ThreadPoolBuilder::new().num_threads(threads).build()?),
    };
    let sim = match &pool {
        Some(pool) => pool.install(|| Simulation::new(&config))?,
        None => Simulation::new(&config)?,
    };
    Ok(Run {
        sim,
        pool,
        n_steps: config.run.n_steps,
        interval: config.run.diagnostic_interval,
        finished: false,
    })
}

impl Run {
    fn advance(&mut self) -> SimResult<()> {
        let step = self.sim.steps_taken();
        let sim = &mut self.sim;
        let result = match &self.pool {
            Some(pool) => pool.install(|| sim.step()),
            None => sim.step(),
        };
        result.map_err(|source| SimulationError::State { step, source })
    }

    fn sample(&self, step: usize) -> DiagnosticSample {
        match &self.pool {
            Some(pool) => pool.install(|| self.sim.sample(step)),
            None => self.sim.sample(step),
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn state(&self) -> &Field {
        self.sim.state()
    }

    pub fn into_state(self) -> Field {
        self.sim.current
    }

    pub fn steps_taken(&self) -> usize {
        self.sim.steps_taken()
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }
}

impl Iterator for Run {
    type Item = SimResult<DiagnosticSample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.n_steps == 0 {
            self.finished = true;
            return Some(Ok(self.sample(0)));
        }
        while self.sim.steps_taken() < self.n_steps {
            let n = self.sim.steps_taken();
            if let Err(err) = self.advance() {
                self.finished = true;
                return Some(Err(err));
            }
            if n % self.interval == 0 {
                let sample = self.sample(n);
                debug!(step = n, kinetic_energy = sample.kinetic_energy, "diagnostic");
                return Some(Ok(sample));
            }
        }
        self.finished = true;
        None
    }
}

impl FusedIterator for Run {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoundaryConfig, GridConfig};
    use crate::fv_core::{
        condition::BoundaryKind,
        initial::{Cylinder, GaussianPulse},
        state::{RHO, RHO_U, RHO_V},
    };

    fn small_cylinder() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.grid = GridConfig {
            nx: 40,
            ny: 20,
            lx: 2.0,
            ly: 1.0,
        };
        config.obstacle = Some(Cylinder {
            cx: 0.5,
            cy: 0.5,
            radius: 0.15,
        });
        config.run.n_steps = 60;
        config.run.diagnostic_interval = 10;
        config
    }

    #[test]
    fn test_samples_follow_interval() {
        let steps: Vec<usize> = run(small_cylinder())
            .unwrap()
            .map(|s| s.unwrap().step)
            .collect();
        assert_eq!(steps, vec![0, 10, 20, 30, 40, 50]);
    }

    #[test]
    fn test_sample_taken_after_step_is_committed() {
        let mut run = run(small_cylinder()).unwrap();
        let first = run.next().unwrap().unwrap();
        assert_eq!(first.step, 0);
        assert_eq!(run.steps_taken(), 1);
        assert!((first.time - run.simulation().dt()).abs() < 1e-15);
    }

    #[test]
    fn test_zero_steps_reports_initial_energy() {
        let mut config = small_cylinder();
        config.run.n_steps = 0;
        let samples: Vec<DiagnosticSample> = run(config.clone()).unwrap().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].step, 0);
        assert_eq!(samples[0].time, 0.0);

        let sim = Simulation::new(&config).unwrap();
        let fluid = (config.grid.nx * config.grid.ny - sim.mask().count_interior()) as f64;
        let fs = config.free_stream;
        let expected = fluid * 0.5 * fs.rho * (fs.u * fs.u + fs.v * fs.v);
        assert!(
            (samples[0].kinetic_energy - expected).abs() < 1e-9,
            "{} vs {}",
            samples[0].kinetic_energy,
            expected
        );
    }

    #[test]
    fn test_obstacle_cells_never_evolve() {
        let config = small_cylinder();
        let mut sim = Simulation::new(&config).unwrap();
        let initial = sim.state().clone();
        for _ in 0..40 {
            sim.step().unwrap();
        }
        let mut solid = 0;
        for i in 1..=config.grid.nx {
            for j in 1..=config.grid.ny {
                if sim.mask().is_solid(i, j) {
                    assert_eq!(sim.state().get(i, j), initial.get(i, j));
                    solid += 1;
                }
            }
        }
        assert!(solid > 0);
    }

    #[test]
    fn test_reflective_walls_keep_mirror_symmetry() {
        let mut config = SimulationConfig::default();
        config.grid = GridConfig {
            nx: 30,
            ny: 16,
            lx: 1.5,
            ly: 0.8,
        };
        config.obstacle = None;
        config.pulse = Some(GaussianPulse {
            x: 0.4,
            y: 0.4,
            sigma: 0.08,
            amplitude: 0.3,
        });
        let ny = config.grid.ny;
        let mut sim = Simulation::new(&config).unwrap();

        for _ in 0..25 {
            sim.step().unwrap();
            let u = sim.state();
            for i in 1..=config.grid.nx {
                for j in 1..=ny / 2 {
                    let low = u.get(i, j);
                    let high = u.get(i, ny + 1 - j);
                    assert!((low[RHO] - high[RHO]).abs() < 1e-12);
                    assert!(
                        (low[RHO_V] + high[RHO_V]).abs() < 1e-12,
                        "rho_v not antisymmetric at ({}, {})",
                        i,
                        j
                    );
                }
            }
        }
    }

    #[test]
    fn test_mass_budget_in_open_channel() {
        let mut config = SimulationConfig::default();
        config.grid = GridConfig {
            nx: 24,
            ny: 12,
            lx: 2.0,
            ly: 1.0,
        };
        config.obstacle = None;
        config.pulse = Some(GaussianPulse {
            x: 1.0,
            y: 0.5,
            sigma: 0.15,
            amplitude: 0.4,
        });
        config.boundaries = BoundaryConfig {
            left: BoundaryKind::Inflow,
            right: BoundaryKind::Outflow,
            bottom: BoundaryKind::Outflow,
            top: BoundaryKind::Outflow,
        };
        let (nx, ny) = (config.grid.nx, config.grid.ny);
        let mut sim = Simulation::new(&config).unwrap();
        let a = sim.dt() / (2.0 * sim.mesh().get_dx());
        let b = sim.dt() / (2.0 * sim.mesh().get_dy());

        for _ in 0..5 {
            // ghost values the stencil will read this step
            let mut before = sim.state().clone();
            sim.bc.enforce(&mut before);
            let rho = |i: usize, j: usize| before.get(i, j)[RHO];
            // the density flux is the momentum itself
            let fx = |i: usize, j: usize| before.get(i, j)[RHO_U];
            let fy = |i: usize, j: usize| before.get(i, j)[RHO_V];

            let mut boundary = 0.0;
            for j in 1..=ny {
                boundary += 0.25 * (rho(nx + 1, j) - rho(1, j) + rho(0, j) - rho(nx, j));
                boundary -= a * (fx(nx + 1, j) + fx(nx, j) - fx(1, j) - fx(0, j));
            }
            for i in 1..=nx {
                boundary += 0.25 * (rho(i, ny + 1) - rho(i, 1) + rho(i, 0) - rho(i, ny));
                boundary -= b * (fy(i, ny + 1) + fy(i, ny) - fy(i, 1) - fy(i, 0));
            }

            let mass_before = total_mass(&before);
            sim.step().unwrap();
            let mass_after = total_mass(sim.state());
            assert!(
                (mass_after - (mass_before + boundary)).abs() < 1e-11,
                "mass {} expected {}",
                mass_after,
                mass_before + boundary
            );
        }
    }

    #[test]
    fn test_uniform_open_channel_stays_uniform() {
        let mut config = SimulationConfig::default();
        config.grid = GridConfig {
            nx: 3,
            ny: 3,
            lx: 0.03,
            ly: 0.03,
        };
        config.obstacle = None;
        config.boundaries.bottom = BoundaryKind::Outflow;
        config.boundaries.top = BoundaryKind::Outflow;
        let mut sim = Simulation::new(&config).unwrap();
        let fs = config.free_stream.conserved(config.physics.gamma);
        sim.step().unwrap();
        assert_eq!(sim.state().get(2, 2), fs);
    }

    #[test]
    fn test_abort_policy_stops_and_fuses() {
        let mut config = small_cylinder();
        config.physics.cfl = 1.0;
        config.run.validation = ValidationPolicy::Abort;
        config.run.n_steps = 5;
        config.run.diagnostic_interval = 1;
        let mut run = run(config).unwrap();
        // far beyond the stable step
        run.sim.dt *= 400.0;

        let mut saw_error = false;
        for item in run.by_ref() {
            if let Err(err) = item {
                assert!(matches!(err, SimulationError::State { .. }));
                saw_error = true;
            }
        }
        assert!(saw_error);
        assert!(run.next().is_none());
    }

    #[test]
    fn test_warn_policy_keeps_running() {
        let mut config = small_cylinder();
        config.physics.cfl = 1.0;
        config.run.validation = ValidationPolicy::Warn;
        let mut sim = Simulation::new(&config).unwrap();
        sim.dt *= 400.0;

        for _ in 0..5 {
            assert!(sim.step().is_ok());
        }
        assert_eq!(sim.steps_taken(), 5);
        assert!(sim.flagged_cells() > 0);
    }

    #[test]
    fn test_warn_reports_only_when_count_changes() {
        let mut sim = Simulation::new(&small_cylinder()).unwrap();
        assert!(!sim.track_flagged(0));
        assert!(sim.track_flagged(3));
        assert!(!sim.track_flagged(3));
        assert!(!sim.track_flagged(3));
        assert!(sim.track_flagged(7));
        assert!(sim.track_flagged(0));
        assert_eq!(sim.flagged_cells(), 0);
    }

    #[test]
    fn test_thread_pool_matches_global_pool() {
        let mut config = small_cylinder();
        config.run.n_steps = 20;
        let global: Vec<DiagnosticSample> = run(config.clone()).unwrap().map(|s| s.unwrap()).collect();
        config.run.threads = 2;
        let pooled: Vec<DiagnosticSample> = run(config).unwrap().map(|s| s.unwrap()).collect();
        assert_eq!(global, pooled);
    }

    #[test]
    fn test_invalid_config_fails_before_running() {
        let mut config = small_cylinder();
        config.grid.nx = 0;
        assert!(matches!(run(config), Err(SimulationError::Config(_))));
    }
}
