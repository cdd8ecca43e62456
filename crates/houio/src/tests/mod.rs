mod arbitrary;
mod parse_good;
mod property_round_trip;
