use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Store,
    Query,
    Stats,
}

/// Percentiles a query op picks from. The extremes are what the history checker can verify.
pub const QUERY_PERCENTILES: [f64; 5] = [0.0, 50.0, 90.0, 99.0, 100.0];

/// Workload profiles controlling the mix of operations the worker issues.
///
/// | Profile     | STORE % | QUERY % | STATS % |
/// |-------------|---------|---------|---------|
/// | ReadHeavy   |   20    |   75    |    5    |
/// | Balanced    |   50    |   45    |    5    |
/// | WriteHeavy  |   80    |   15    |    5    |
/// | StoreOnly   |  100    |    0    |    0    |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadProfile {
    ReadHeavy,
    Balanced,
    WriteHeavy,
    StoreOnly,
}

impl WorkloadProfile {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "read-heavy" => Some(WorkloadProfile::ReadHeavy),
            "balanced" => Some(WorkloadProfile::Balanced),
            "write-heavy" => Some(WorkloadProfile::WriteHeavy),
            "store-only" => Some(WorkloadProfile::StoreOnly),
            _ => None,
        }
    }

    pub fn as_name(&self) -> &'static str {
        match self {
            WorkloadProfile::ReadHeavy => "read-heavy",
            WorkloadProfile::Balanced => "balanced",
            WorkloadProfile::WriteHeavy => "write-heavy",
            WorkloadProfile::StoreOnly => "store-only",
        }
    }

    /// Draw a random operation using `rng`.
    pub fn sample(&self, rng: &mut impl Rng) -> Op {
        let roll: u32 = rng.gen_range(0..100);
        self.op_for_roll(roll)
    }

    /// Map a roll in `0..100` to an `Op` according to the profile's percentages.
    /// Exposed for deterministic testing.
    pub fn op_for_roll(&self, roll: u32) -> Op {
        let store_pct = match self {
            WorkloadProfile::ReadHeavy => 20,
            WorkloadProfile::Balanced => 50,
            WorkloadProfile::WriteHeavy => 80,
            WorkloadProfile::StoreOnly => return Op::Store,
        };
        if roll < store_pct {
            Op::Store
        } else if roll < 95 {
            Op::Query
        } else {
            Op::Stats
        }
    }
}

/// Pick one of [`QUERY_PERCENTILES`].
pub fn sample_percentile(rng: &mut impl Rng) -> f64 {
    QUERY_PERCENTILES[rng.gen_range(0..QUERY_PERCENTILES.len())]
}
