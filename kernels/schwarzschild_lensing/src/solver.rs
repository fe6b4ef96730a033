// Adaptive Runge-Kutta 5(4) integration with event detection
//
// The geodesic equation is integrated with the Dormand-Prince embedded
// pair: seven stages produce a 5th-order solution plus a 4th-order error
// estimate almost for free, and the step size adapts so the local error
// stays inside the requested tolerances.
//
// Events are scalar functions g(t, y) watched for sign changes between
// accepted steps. Each event carries a crossing direction filter and an
// action: `Stop` ends the integration at the refined crossing (the horizon
// is terminal), `Continue` records the crossing and keeps going (reaching
// the escape radius is informational). Crossings are pinned down by
// bisection on a cubic Hermite interpolant of the step, so no extra
// integration work is needed to localize them.

// ============================================================================
// DORMAND-PRINCE 5(4) TABLEAU
// ============================================================================

const STAGES: usize = 7;

// Nodes c_i
const C: [f64; STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

// Stage coupling a_ij (strictly lower triangular)
const A: [[f64; STAGES - 1]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

// 5th-order solution weights b_i
const B: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

// Error weights b_i - b*_i (5th minus embedded 4th order)
const B_ERR: [f64; STAGES] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

// Bisection never needs more than ~60 halvings to reach machine precision;
// the cap only guards against a pathological tolerance setting
const MAX_BISECTIONS: usize = 128;

// ============================================================================
// ODE SYSTEM INTERFACE
// ============================================================================

// System of ordinary differential equations: dy/dt = f(t, y)
pub trait OdeSystem<const N: usize> {
    // Evaluate the right-hand side into `dydt`
    fn rhs(&self, t: f64, y: &[f64; N], dydt: &mut [f64; N]);
}

// Scalar event function g(t, y) whose zero crossings are tracked
pub trait EventFunction<const N: usize> {
    fn eval(&self, t: f64, y: &[f64; N]) -> f64;
}

// Any matching closure works as an event function
impl<const N: usize, F> EventFunction<N> for F
where
    F: Fn(f64, &[f64; N]) -> f64,
{
    fn eval(&self, t: f64, y: &[f64; N]) -> f64 {
        self(t, y)
    }
}

// Which zero crossings of g count as the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDirection {
    // Any sign change
    Any,
    // Only g going from non-positive to positive
    Rising,
    // Only g going from non-negative to negative
    Falling,
}

// What happens when the event fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    // Record the crossing and keep integrating
    Continue,
    // End the integration at the refined crossing point
    Stop,
}

// An event function bundled with its detection semantics
#[derive(Clone, Copy)]
pub struct EventSpec<'a, const N: usize> {
    pub g: &'a dyn EventFunction<N>,
    pub direction: EventDirection,
    pub action: EventAction,
}

// A located event occurrence
#[derive(Debug, Clone, Copy)]
pub struct EventRecord<const N: usize> {
    // Index into the event slice passed to `solve`
    pub event: usize,
    pub t: f64,
    pub y: [f64; N],
}

// Sign-change test between two accepted states, honoring the direction filter
pub fn sign_change_detected(g_prev: f64, g_new: f64, direction: EventDirection) -> bool {
    let rising = g_prev <= 0.0 && g_new > 0.0;
    let falling = g_prev >= 0.0 && g_new < 0.0;
    match direction {
        EventDirection::Rising => rising,
        EventDirection::Falling => falling,
        EventDirection::Any => rising || falling,
    }
}

// ============================================================================
// STEP CONTROL
// ============================================================================

// Tolerance specification for error control
//
// A step is accepted when max_n |err_n| / (atol + rtol*|y_n|) <= 1
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Tolerances {
    pub fn new(rtol: f64, atol: f64) -> Self {
        assert!(rtol > 0.0 && rtol.is_finite(), "rtol must be positive and finite");
        assert!(atol > 0.0 && atol.is_finite(), "atol must be positive and finite");
        Self { rtol, atol }
    }
}

// I-controller for the step size: h_new = safety * h * error^(-1/5)
#[derive(Clone)]
pub struct StepController {
    pub safety: f64,
    pub max_factor: f64,
    pub min_factor: f64,
    // 1/(p+1) where p = 4 is the order of the error estimate
    exponent: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
            exponent: 1.0 / 5.0,
        }
    }
}

impl StepController {
    pub fn compute_factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        let factor = self.safety * error.powf(-self.exponent);
        factor.clamp(self.min_factor, self.max_factor)
    }
}

// Result of a single trial step
#[derive(Debug, Clone)]
pub struct StepResult<const N: usize> {
    // New state (5th-order solution)
    pub y: [f64; N],
    // New independent variable value
    pub t: f64,
    // Normalized error estimate (<= 1.0 means accepted)
    pub error: f64,
    // Suggested magnitude for the next step
    pub h_next: f64,
    pub accepted: bool,
}

// Integration statistics for diagnostics
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub fn_evals: u64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

// ============================================================================
// SOLUTION
// ============================================================================

// Dense integration output: every accepted step plus any terminal event point
#[derive(Debug, Clone)]
pub struct Solution<const N: usize> {
    // Independent variable at each sample (t[0] is the start point)
    pub t: Vec<f64>,
    // State at each sample
    pub y: Vec<[f64; N]>,
    // Non-terminal event crossings, in encounter order
    pub events: Vec<EventRecord<N>>,
    // Set when a Stop event ended the integration; its point is the final sample
    pub terminal: Option<EventRecord<N>>,
}

impl<const N: usize> Solution<N> {
    // Last sample (the terminal event point if one fired)
    pub fn final_state(&self) -> (f64, [f64; N]) {
        let last = self.t.len() - 1;
        (self.t[last], self.y[last])
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

// ============================================================================
// SOLVER
// ============================================================================

// Dormand-Prince 5(4) solver with a pre-allocated stage workspace
#[derive(Clone)]
pub struct Rk45<const N: usize> {
    tol: Tolerances,
    controller: StepController,
    // Minimum step magnitude before giving up
    pub h_min: f64,
    // Maximum step magnitude
    pub h_max: f64,
    // Step budget before declaring non-convergence
    pub max_steps: u64,
    // Half-width below which an event bracket counts as converged
    pub root_tol: f64,
    // Stage evaluations
    k: [[f64; N]; STAGES],
    pub stats: Stats,
}

impl<const N: usize> Rk45<N> {
    pub fn new(tol: Tolerances) -> Self {
        Self {
            tol,
            controller: StepController::default(),
            h_min: 1e-14,
            h_max: f64::INFINITY,
            max_steps: 1_000_000,
            root_tol: 1e-12,
            k: [[0.0; N]; STAGES],
            stats: Stats::default(),
        }
    }

    pub fn reset_stats(&mut self) {
        self.stats = Stats::default();
    }

    // Perform a single trial step of (signed) size h
    pub fn step<S: OdeSystem<N>>(&mut self, sys: &S, t: f64, y: &[f64; N], h: f64) -> StepResult<N> {
        let h = h.signum() * h.abs().clamp(self.h_min, self.h_max);

        self.compute_stages(sys, t, y, h);
        let y_new = self.compute_solution(y, h);
        let error = self.compute_error(&y_new, h);
        let accepted = error <= 1.0;

        let factor = self.controller.compute_factor(error);
        let h_next = (h.abs() * factor).clamp(self.h_min, self.h_max);

        self.stats.fn_evals += STAGES as u64;
        if accepted {
            self.stats.accepted_steps += 1;
        } else {
            self.stats.rejected_steps += 1;
        }

        StepResult {
            y: y_new,
            t: t + h,
            error,
            h_next,
            accepted,
        }
    }

    // Integrate from t0 to tf, collecting every accepted step and watching
    // the given events.
    //
    // Backward integration works by passing tf < t0 together with a negative
    // h0. A `Stop` event appends its refined crossing as the final sample
    // and returns early; `Continue` events accumulate in `Solution::events`.
    pub fn solve<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
        h0: f64,
        events: &[EventSpec<'_, N>],
    ) -> Result<Solution<N>, SolverError> {
        self.validate_inputs(t0, y0, tf, h0)?;

        let mut solution = Solution {
            t: vec![t0],
            y: vec![*y0],
            events: Vec::new(),
            terminal: None,
        };
        if t0 == tf {
            return Ok(solution);
        }

        let mut t = t0;
        let mut y = *y0;
        let mut h = h0;
        let direction = (tf - t0).signum();

        let mut g_prev: Vec<f64> = events.iter().map(|spec| spec.g.eval(t, &y)).collect();
        let mut step_count = 0u64;

        while (tf - t) * direction > self.h_min {
            // Don't overshoot the endpoint
            if (t + h - tf) * direction > 0.0 {
                h = tf - t;
            }

            let result = self.step(sys, t, &y, h);

            if result.accepted {
                if !result.y.iter().all(|v| v.is_finite()) {
                    return Err(SolverError::NonFiniteState { t: result.t });
                }

                // Event pass over the accepted step [t, result.t]. The
                // earliest Stop crossing wins if several events fire at once.
                let mut terminal: Option<EventRecord<N>> = None;
                for (idx, spec) in events.iter().enumerate() {
                    let g_new = spec.g.eval(result.t, &result.y);
                    if sign_change_detected(g_prev[idx], g_new, spec.direction) {
                        let (t_event, y_event) =
                            self.locate_event(sys, spec.g, t, &y, result.t, &result.y);
                        let record = EventRecord {
                            event: idx,
                            t: t_event,
                            y: y_event,
                        };
                        match spec.action {
                            EventAction::Continue => solution.events.push(record),
                            EventAction::Stop => {
                                let earlier = terminal
                                    .map(|held| (t_event - held.t) * direction < 0.0)
                                    .unwrap_or(true);
                                if earlier {
                                    terminal = Some(record);
                                }
                            }
                        }
                    }
                    g_prev[idx] = g_new;
                }

                if let Some(record) = terminal {
                    solution.t.push(record.t);
                    solution.y.push(record.y);
                    solution.terminal = Some(record);
                    return Ok(solution);
                }

                t = result.t;
                y = result.y;
                solution.t.push(t);
                solution.y.push(y);
            }

            h = result.h_next * direction;

            step_count += 1;
            if step_count > self.max_steps {
                return Err(SolverError::MaxStepsExceeded);
            }

            // If the step was rejected and the next size is already pinned
            // at h_min, no progress is possible
            if !result.accepted && result.h_next <= self.h_min && (tf - t) * direction > self.h_min
            {
                return Err(SolverError::StepSizeTooSmall {
                    t,
                    h: result.h_next,
                });
            }
        }

        Ok(solution)
    }

    // Compute all seven stages
    #[allow(clippy::needless_range_loop)]
    fn compute_stages<S: OdeSystem<N>>(&mut self, sys: &S, t: f64, y: &[f64; N], h: f64) {
        let mut y_temp = [0.0; N];

        sys.rhs(t, y, &mut self.k[0]);

        for i in 1..STAGES {
            for n in 0..N {
                let mut sum = 0.0;
                for j in 0..i {
                    sum += A[i][j] * self.k[j][n];
                }
                y_temp[n] = y[n] + h * sum;
            }
            sys.rhs(t + C[i] * h, &y_temp, &mut self.k[i]);
        }
    }

    // 5th-order solution from the stages
    #[allow(clippy::needless_range_loop)]
    fn compute_solution(&self, y: &[f64; N], h: f64) -> [f64; N] {
        let mut y_new = [0.0; N];
        for n in 0..N {
            let mut sum = 0.0;
            for i in 0..STAGES {
                sum += B[i] * self.k[i][n];
            }
            y_new[n] = y[n] + h * sum;
        }
        y_new
    }

    // Normalized error estimate (infinity norm of the scaled 5th/4th gap)
    #[allow(clippy::needless_range_loop)]
    fn compute_error(&self, y_new: &[f64; N], h: f64) -> f64 {
        let mut max_err: f64 = 0.0;
        for n in 0..N {
            let mut err_n = 0.0;
            for i in 0..STAGES {
                err_n += B_ERR[i] * self.k[i][n];
            }
            err_n *= h;

            let scale = self.tol.atol + self.tol.rtol * y_new[n].abs();
            max_err = max_err.max(err_n.abs() / scale);
        }
        max_err
    }

    // Pin down an event crossing inside an accepted step.
    //
    // The state inside the step is reconstructed with a cubic Hermite
    // interpolant from the endpoint states and RHS values (O(h^4) accuracy),
    // and the crossing is bracketed down by bisection. The sign-change test
    // already guarantees the bracket, so this cannot fail.
    fn locate_event<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        g: &dyn EventFunction<N>,
        t_a: f64,
        y_a: &[f64; N],
        t_b: f64,
        y_b: &[f64; N],
    ) -> (f64, [f64; N]) {
        let mut f_a = [0.0; N];
        let mut f_b = [0.0; N];
        sys.rhs(t_a, y_a, &mut f_a);
        sys.rhs(t_b, y_b, &mut f_b);
        self.stats.fn_evals += 2;

        let dt = t_b - t_a;
        let interpolate = |t: f64| -> [f64; N] {
            let alpha = (t - t_a) / dt;
            let a2 = alpha * alpha;
            let a3 = a2 * alpha;
            let h00 = 1.0 - 3.0 * a2 + 2.0 * a3;
            let h10 = alpha - 2.0 * a2 + a3;
            let h01 = 3.0 * a2 - 2.0 * a3;
            let h11 = -a2 + a3;

            let mut y = [0.0; N];
            for n in 0..N {
                y[n] = h00 * y_a[n] + h10 * dt * f_a[n] + h01 * y_b[n] + h11 * dt * f_b[n];
            }
            y
        };

        let mut lo = t_a;
        let mut hi = t_b;
        let mut g_lo = g.eval(lo, y_a);
        for _ in 0..MAX_BISECTIONS {
            let mid = 0.5 * (lo + hi);
            if mid == lo || mid == hi {
                break;
            }
            let g_mid = g.eval(mid, &interpolate(mid));
            if g_mid == 0.0 {
                lo = mid;
                hi = mid;
                break;
            }
            if (g_lo < 0.0) == (g_mid < 0.0) {
                lo = mid;
                g_lo = g_mid;
            } else {
                hi = mid;
            }
            if (hi - lo).abs() <= self.root_tol {
                break;
            }
        }

        let t_event = 0.5 * (lo + hi);
        (t_event, interpolate(t_event))
    }

    fn validate_inputs(&self, t0: f64, y0: &[f64; N], tf: f64, h0: f64) -> Result<(), SolverError> {
        if !t0.is_finite() || !tf.is_finite() || !h0.is_finite() {
            return Err(SolverError::InvalidInput {
                message: "t0, tf, and h0 must be finite".to_string(),
            });
        }
        let span = tf - t0;
        if span != 0.0 && h0 == 0.0 {
            return Err(SolverError::InvalidInput {
                message: "h0 must be non-zero".to_string(),
            });
        }
        if span != 0.0 && h0.signum() != span.signum() {
            return Err(SolverError::InvalidInput {
                message: "h0 sign must match integration direction (tf - t0)".to_string(),
            });
        }
        for (i, &val) in y0.iter().enumerate() {
            if !val.is_finite() {
                return Err(SolverError::InvalidInput {
                    message: format!("y0[{}] is not finite", i),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

// Ways the adaptive integration can fail to converge
#[derive(Debug, Clone)]
pub enum SolverError {
    // Step size collapsed without making progress
    StepSizeTooSmall { t: f64, h: f64 },
    // Step budget exhausted before reaching the endpoint
    MaxStepsExceeded,
    // Bad integration arguments
    InvalidInput { message: String },
    // State stopped being finite
    NonFiniteState { t: f64 },
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::StepSizeTooSmall { t, h } => {
                write!(f, "Step size {} too small at t = {}", h, t)
            }
            SolverError::MaxStepsExceeded => {
                write!(f, "Maximum number of integration steps exceeded")
            }
            SolverError::InvalidInput { message } => {
                write!(f, "Invalid input: {}", message)
            }
            SolverError::NonFiniteState { t } => {
                write!(f, "Non-finite state detected at t = {}", t)
            }
        }
    }
}

impl std::error::Error for SolverError {}

// ============================================================================
// TESTS
// ============================================================================
