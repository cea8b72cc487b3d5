mod grouping;
mod queries;
