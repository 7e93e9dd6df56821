diesel::table! {
    users (id) {
        id -> Integer,
        external_id -> BigInt,
        name -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::table! {
    workout_plans (id) {
        id -> Integer,
        user_id -> Integer,
        name -> Text,
        created_at -> BigInt,
    }
}

diesel::table! {
    workout_days (id) {
        id -> Integer,
        plan_id -> Integer,
        weekday -> Text,
        note -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::table! {
    muscle_groups (id) {
        id -> Integer,
        day_id -> Integer,
        name -> Text,
        created_at -> BigInt,
    }
}

diesel::table! {
    exercises (id) {
        id -> Integer,
        muscle_group_id -> Integer,
        name -> Text,
        sets -> Nullable<Integer>,
        reps -> Nullable<Integer>,
        weight -> Nullable<Integer>,
        created_at -> BigInt,
    }
}
