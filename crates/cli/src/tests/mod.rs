mod rules_tests;
