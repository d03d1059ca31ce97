use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::Signed;
use rust_decimal_macros::dec;

use nutricoach::{
    ActivityLevel, BodyProfile, CheckInEngine, CheckInObservation, EnergyCalculator, Gender,
    GoalCalculator, GoalSpec, MacroPreference, MacroRatioSet, NutritionPolicy,
};

fn gender_strategy() -> impl Strategy<Value = Gender> {
    prop_oneof![Just(Gender::Male), Just(Gender::Female), Just(Gender::Other)]
}

fn preset_strategy() -> impl Strategy<Value = MacroPreference> {
    prop::sample::select(MacroPreference::PRESETS.to_vec())
}

/// Weight in tenths of a pound between 90 and 400 lbs
fn weight_strategy() -> impl Strategy<Value = Decimal> {
    (900i64..4000).prop_map(|tenths| Decimal::new(tenths, 1))
}

proptest! {
    #[test]
    fn macro_grams_stay_close_to_calories(
        calories in 1200i64..5000,
        preference in preset_strategy(),
    ) {
        let calculator = GoalCalculator::new();
        let ratios = NutritionPolicy::default()
            .macro_presets
            .ratios(preference)
            .unwrap();
        let grams = calculator
            .calculate_macro_grams(Decimal::from(calories), &ratios)
            .unwrap();

        let rebuilt = grams.protein_grams * dec!(4) + grams.carbs_grams * dec!(4) + grams.fat_grams * dec!(9);
        // Half a gram of rounding per macro: 2 + 2 + 4.5 kcal
        prop_assert!((rebuilt - Decimal::from(calories)).abs() <= dec!(8.5));
        prop_assert!(grams.protein_grams >= Decimal::ZERO);
        prop_assert!(grams.carbs_grams >= Decimal::ZERO);
        prop_assert!(grams.fat_grams >= Decimal::ZERO);
    }

    #[test]
    fn custom_ratios_are_scale_invariant(
        protein in 1i64..100,
        carbs in 0i64..100,
        fat in 1i64..100,
        scale in 1i64..20,
        calories in 1200i64..4000,
    ) {
        let calculator = GoalCalculator::new();
        let base = MacroRatioSet::new(Decimal::from(protein), Decimal::from(carbs), Decimal::from(fat));
        let scaled = MacroRatioSet::new(
            Decimal::from(protein * scale),
            Decimal::from(carbs * scale),
            Decimal::from(fat * scale),
        );
        let calories = Decimal::from(calories);

        let a = calculator.calculate_macro_grams(calories, &base).unwrap();
        let b = calculator.calculate_macro_grams(calories, &scaled).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn bmr_grows_with_weight(
        gender in gender_strategy(),
        weight_kg in 40i64..200,
        height_cm in 140i64..210,
        age in 18u32..90,
    ) {
        let calculator = EnergyCalculator::new();
        let lighter = BodyProfile::new(gender, Decimal::from(weight_kg), Decimal::from(height_cm), age).unwrap();
        let heavier = BodyProfile::new(gender, Decimal::from(weight_kg + 1), Decimal::from(height_cm), age).unwrap();

        let difference = calculator.calculate_bmr(&heavier).unwrap()
            - calculator.calculate_bmr(&lighter).unwrap();
        prop_assert_eq!(difference, dec!(10));

        let sedentary = calculator.calculate_tdee(&lighter, ActivityLevel::Sedentary).unwrap();
        let very_active = calculator.calculate_tdee(&lighter, ActivityLevel::VeryActive).unwrap();
        prop_assert!(very_active > sedentary);
        prop_assert_eq!(sedentary, sedentary.floor());
    }

    #[test]
    fn daily_target_never_below_floor(
        tdee in 800i64..4000,
        weekly_tenths in -40i64..20,
        gender in gender_strategy(),
    ) {
        let calculator = GoalCalculator::new();
        let target = calculator
            .calculate_daily_calorie_target(Decimal::from(tdee), Decimal::new(weekly_tenths, 1), gender)
            .unwrap();
        let floor = NutritionPolicy::default().calorie_floors.floor(gender);

        prop_assert!(target.daily_calories >= floor);
        prop_assert_eq!(target.daily_calories, target.daily_calories.floor());
        if target.floor_applied {
            prop_assert_eq!(target.daily_calories, floor);
        }
    }

    #[test]
    fn required_change_points_at_target(
        current in weight_strategy(),
        target in weight_strategy(),
        days in 1i64..400,
    ) {
        let calculator = GoalCalculator::new();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap();
        let target_date = (now + Duration::days(days)).date_naive();

        let weekly = calculator
            .required_weekly_change(current, target, target_date, now)
            .unwrap();
        prop_assert_eq!(weekly.signum(), (target - current).signum());

        // Walking the rate for the whole period lands on the target
        let reached = current + weekly * Decimal::from(days) / dec!(7);
        prop_assert!((reached - target).abs() < dec!(0.000001));
    }

    #[test]
    fn goal_translation_is_repeatable(
        tdee in 1400i64..4000,
        current in weight_strategy(),
        target in weight_strategy(),
        days in -30i64..400,
        gender in gender_strategy(),
    ) {
        let calculator = GoalCalculator::new();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap();
        let goal = GoalSpec {
            current_weight_lbs: current,
            target_weight_lbs: target,
            target_date: (now + Duration::days(days)).date_naive(),
        };

        let first = calculator.translate_goal(Decimal::from(tdee), &goal, gender, now).unwrap();
        let second = calculator.translate_goal(Decimal::from(tdee), &goal, gender, now).unwrap();
        prop_assert_eq!(&first, &second);
        if days <= 0 {
            prop_assert_eq!(first.weekly_change, Decimal::ZERO);
        }
    }

    #[test]
    fn true_tdee_mirrors_weight_change(
        avg in 1500i64..4000,
        change_tenths in 0i64..30,
    ) {
        let engine = CheckInEngine::new();
        let avg = Decimal::from(avg);
        let change = Decimal::new(change_tenths, 1);

        let after_loss = engine.calculate_true_tdee(avg, -change, 7).unwrap();
        let after_gain = engine.calculate_true_tdee(avg, change, 7).unwrap();
        prop_assert_eq!(after_loss - avg, avg - after_gain);
        prop_assert!(after_loss >= after_gain);
    }

    #[test]
    fn check_in_moves_calories_by_one_step(
        previous in weight_strategy(),
        delta_tenths in -30i64..30,
        target in weight_strategy(),
        current_target in 1300i64..3500,
        gender in gender_strategy(),
    ) {
        let engine = CheckInEngine::new();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap();
        let current_weight = previous + Decimal::new(delta_tenths, 1);
        prop_assume!(current_weight > Decimal::ZERO);

        let goal = GoalSpec {
            current_weight_lbs: previous,
            target_weight_lbs: target,
            target_date: (now + Duration::days(84)).date_naive(),
        };
        let observation = CheckInObservation::weekly(previous, current_weight, dec!(2000));
        let result = engine
            .perform_weekly_check_in(
                &observation,
                &goal,
                Decimal::from(current_target),
                &MacroRatioSet::new(dec!(0.30), dec!(0.35), dec!(0.35)),
                gender,
                now,
            )
            .unwrap();

        let change = result.calorie_change().abs();
        prop_assert!(change == Decimal::ZERO || change == dec!(100) || change == dec!(50));
    }
}
