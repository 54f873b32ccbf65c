mod locked;
