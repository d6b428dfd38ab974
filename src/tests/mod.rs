mod cs3;
