diesel::table! {
    daily_file_counts (person, day) {
        person -> Text,
        day -> Date,
        file_count -> Int8,
        updated_at -> Timestamptz,
    }
}
