use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use nutricoach::{
    ActivityLevel, DailyCalorieTotal, Gender, GoalCalculator, GoalPlanner, MacroPreference,
    ProgressWindow, UserGoalRecord, WeightEntry,
};

/// Performance benchmarks for the planning and check-in paths
///
/// Check-in observation building is measured against growing diary
/// histories since callers may hand over more than one week of logs.

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 7, 0, 0).unwrap()
}

fn create_benchmark_record() -> UserGoalRecord {
    UserGoalRecord {
        gender: Gender::Male,
        height_cm: dec!(180),
        birth_date: NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
        activity_level: ActivityLevel::Moderate,
        starting_weight_lbs: dec!(210),
        current_weight_lbs: dec!(210),
        target_weight_lbs: dec!(190),
        target_date: (now() + Duration::days(140)).date_naive(),
        macro_preference: MacroPreference::HighProtein,
        macro_ratios: None,
        current_targets: None,
        last_check_in: None,
    }
}

fn create_log_history(days: i64) -> (Vec<DailyCalorieTotal>, Vec<WeightEntry>) {
    let today = now().date_naive();
    let calories = (0..days)
        .flat_map(|back| {
            let date = today - Duration::days(back);
            // Three meals per day
            [dec!(600), dec!(800), dec!(900)]
                .into_iter()
                .map(move |calories| DailyCalorieTotal { date, calories })
        })
        .collect();
    let weights = (0..days)
        .map(|back| WeightEntry {
            date: today - Duration::days(back),
            weight_lbs: dec!(200) + Decimal::new(back, 1),
        })
        .collect();
    (calories, weights)
}

fn bench_goal_plan(c: &mut Criterion) {
    let planner = GoalPlanner::new();
    let record = create_benchmark_record();

    c.bench_function("plan", |b| {
        b.iter(|| planner.plan(black_box(&record), now()).unwrap());
    });
}

fn bench_macro_targets(c: &mut Criterion) {
    let calculator = GoalCalculator::new();
    let mut group = c.benchmark_group("Macro Targets");

    for preference in MacroPreference::PRESETS {
        group.bench_with_input(
            BenchmarkId::new("get_macro_targets", preference),
            &preference,
            |b, &preference| {
                b.iter(|| {
                    calculator
                        .get_macro_targets(black_box(dec!(2350)), preference, None)
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_check_in(c: &mut Criterion) {
    let planner = GoalPlanner::new();
    let mut record = create_benchmark_record();
    let plan = planner.plan(&record, now()).unwrap();
    record.apply_plan(&plan);

    let mut group = c.benchmark_group("Check-in");

    for &days in &[7i64, 30, 365] {
        let (calories, weights) = create_log_history(days);

        group.throughput(Throughput::Elements(calories.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("observation", days),
            &(calories.clone(), weights.clone()),
            |b, (calories, weights)| {
                let window = ProgressWindow::weekly(now().date_naive());
                b.iter(|| window.observation(black_box(calories), black_box(weights)).unwrap());
            },
        );
        group.bench_with_input(
            BenchmarkId::new("check_in", days),
            &(calories, weights),
            |b, (calories, weights)| {
                b.iter(|| {
                    planner
                        .check_in(black_box(&record), calories, weights, now())
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_goal_plan, bench_macro_targets, bench_check_in);
criterion_main!(benches);
