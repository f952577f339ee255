mod helpers;
mod lifecycle;
mod round_trip;
