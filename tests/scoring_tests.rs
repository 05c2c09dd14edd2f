// Scoring tests: histogram score, score2, strictness levels, overall score

use vmidle::analysis::scoring::*;
use vmidle::models::*;

fn hist(bins: Vec<f64>) -> Histogram {
    Histogram {
        low: 0.0,
        high: 1.0,
        bins,
    }
}

fn one_hot(n: usize, at: usize) -> Histogram {
    let mut bins = vec![0.0; n];
    bins[at] = 1.0;
    hist(bins)
}

fn rate_stats(min: f64, median: f64, mean: f64) -> RateStats {
    RateStats {
        min,
        max: 4.0,
        mean,
        median,
        deviation: 0.0,
        pct_deviation: 0.0,
    }
}

#[test]
fn all_idle_scores_zero_and_all_busy_scores_ten() {
    assert_eq!(score(Some(&one_hot(10, 0))), Some(0.0));
    assert_eq!(score(Some(&one_hot(10, 9))), Some(10.0));
}

#[test]
fn score_is_weighted_average_bin_rescaled() {
    let mut bins = vec![0.0; 10];
    bins[0] = 0.5;
    bins[3] = 0.5;
    // (3 * 0.5) * 10 / 9 = 1.666.. -> 1.67
    assert_eq!(score(Some(&hist(bins))), Some(1.67));
}

#[test]
fn score_stays_within_bounds() {
    for n in 2..12 {
        for at in 0..n {
            let s = score(Some(&one_hot(n, at))).unwrap();
            assert!((0.0..=MAX_SCORE).contains(&s), "n={} at={} s={}", n, at, s);
        }
    }
}

#[test]
fn score_absent_without_histogram() {
    assert_eq!(score(None), None);
    assert_eq!(score(Some(&hist(vec![1.0]))), None);
}

#[test]
fn score2_is_capped_ratio() {
    assert_eq!(score2(Some(1024.0), 4096.0), Some(2.5));
    assert_eq!(score2(Some(1e9), 4096.0), Some(10.0));
    assert_eq!(score2(None, 4096.0), None);
    assert_eq!(score2(Some(1.0), 0.0), None);
}

#[test]
fn overall_is_mean_of_scores() {
    assert_eq!(overall(&[1.0, 2.0, 6.0], Level::Soft), Some(3.0));
    assert_eq!(overall(&[], Level::Soft), None);
}

#[test]
fn softer_counts_the_highest_score_twice() {
    assert_eq!(overall(&[1.0, 2.0, 6.0], Level::Softer), Some(3.75));
    assert_eq!(overall(&[4.0], Level::Softer), Some(4.0));
}

#[test]
fn cpu_base_follows_level() {
    assert_eq!(cpu_base(Level::Hard, 8, Some(1.2)), 8.0);
    assert_eq!(cpu_base(Level::Medium, 8, Some(1.2)), 2.0);
    assert_eq!(cpu_base(Level::Medium, 8, None), 4.0);
    assert_eq!(cpu_base(Level::Soft, 8, Some(7.0)), 1.0);
    assert_eq!(cpu_base(Level::Softer, 8, Some(7.0)), 1.0);
}

#[test]
fn cpu_base_never_below_one_core() {
    assert_eq!(cpu_base(Level::Hard, 0, None), 1.0);
    assert_eq!(cpu_base(Level::Medium, 0, Some(0.0)), 1.0);
}

#[test]
fn representative_follows_level() {
    let st = rate_stats(0.1, 0.2, 0.3);
    assert_eq!(Representative::for_level(Level::Hard).pick(&st), 0.1);
    assert_eq!(Representative::for_level(Level::Medium).pick(&st), 0.2);
    assert_eq!(Representative::for_level(Level::Soft).pick(&st), 0.3);
    assert_eq!(Representative::for_level(Level::Softer).pick(&st), 0.1);
}

#[test]
fn damping_defaults_per_level() {
    let d = Damping::default();
    assert_eq!(d.for_level(Level::Hard), 0.25);
    assert_eq!(d.for_level(Level::Medium), 0.75);
    assert_eq!(d.for_level(Level::Soft), 0.85);
    assert_eq!(d.for_level(Level::Softer), 0.85);
}

#[test]
fn level_parses_and_displays() {
    for level in [Level::Hard, Level::Medium, Level::Soft, Level::Softer] {
        assert_eq!(level.to_string().parse::<Level>(), Ok(level));
    }
    assert!("lazy".parse::<Level>().is_err());
    assert_eq!(Level::default(), Level::Soft);
}
