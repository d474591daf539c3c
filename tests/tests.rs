extern crate regex;
extern crate rematch;

mod util;
