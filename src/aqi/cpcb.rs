//! CPCB sub-index calculation from particulate concentrations

/// (concentration low, concentration high, index low, index high)
type Breakpoint = (f64, f64, i32, i32);

const PM25_BREAKPOINTS: [Breakpoint; 6] = [
    (0.0, 30.0, 0, 50),
    (31.0, 60.0, 51, 100),
    (61.0, 90.0, 101, 200),
    (91.0, 120.0, 201, 300),
    (121.0, 250.0, 301, 400),
    (251.0, 999.0, 401, 500),
];

const PM10_BREAKPOINTS: [Breakpoint; 6] = [
    (0.0, 50.0, 0, 50),
    (51.0, 100.0, 51, 100),
    (101.0, 250.0, 101, 200),
    (251.0, 350.0, 201, 300),
    (351.0, 430.0, 301, 400),
    (431.0, 999.0, 401, 500),
];

const MAX_INDEX: i32 = 500;

fn sub_index(concentration: f64, breakpoints: &[Breakpoint]) -> Option<i32> {
    if !concentration.is_finite() || concentration < 0.0 {
        return None;
    }

    for &(c_low, c_high, i_low, i_high) in breakpoints {
        if concentration <= c_high {
            // Values between two integer bands (e.g. 30.5) start the upper band.
            let clamped = concentration.max(c_low);
            let slope = f64::from(i_high - i_low) / (c_high - c_low);
            let index = slope * (clamped - c_low) + f64::from(i_low);
            return Some(index.round() as i32);
        }
    }

    Some(MAX_INDEX)
}

/// PM2.5 sub-index, `None` for negative or non-finite input
#[must_use]
pub fn pm25_sub_index(pm25: f64) -> Option<i32> {
    sub_index(pm25, &PM25_BREAKPOINTS)
}

/// PM10 sub-index, `None` for negative or non-finite input
#[must_use]
pub fn pm10_sub_index(pm10: f64) -> Option<i32> {
    sub_index(pm10, &PM10_BREAKPOINTS)
}

/// Overall index: the worse of the available particulate sub-indices
#[must_use]
pub fn aqi_from_particulates(pm25: Option<f64>, pm10: Option<f64>) -> Option<i32> {
    let pm25_index = pm25.and_then(pm25_sub_index);
    let pm10_index = pm10.and_then(pm10_sub_index);

    match (pm25_index, pm10_index) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
